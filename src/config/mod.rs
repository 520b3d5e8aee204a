// ABOUTME: Configuration management module for server settings
// ABOUTME: Environment-only configuration, no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! Configuration module for the TeamSync server

/// Environment and server configuration
pub mod environment;

pub use environment::{
    AuthConfig, DeviceFlowConfig, Environment, OAuthConfig, OAuthProviderConfig, RateLimitConfig,
    ServerConfig,
};
