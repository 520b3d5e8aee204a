// ABOUTME: Command modules for teamsync-cli
// ABOUTME: Session commands live in `auth`
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

pub mod auth;
