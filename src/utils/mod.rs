// ABOUTME: Small shared utilities
// ABOUTME: Currently the pooled outbound HTTP clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

/// Outbound HTTP clients with per-purpose timeouts
pub mod http_client;
