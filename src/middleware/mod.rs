// ABOUTME: HTTP middleware for the authorization service
// ABOUTME: Bearer authentication, per-IP rate limiting, and CORS
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

/// Bearer token authentication
pub mod auth;
/// Cross-origin request configuration
pub mod cors;
/// Fixed-window per-client rate limiting
pub mod rate_limiting;

pub use auth::{require_auth, AuthUser};
pub use cors::setup_cors;
pub use rate_limiting::{rate_limit_middleware, AuthRateLimiter};
