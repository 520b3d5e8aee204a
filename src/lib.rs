// ABOUTME: Main library entry point for the TeamSync authorization service
// ABOUTME: Device-code authorization, OAuth login, token lifecycle, and the device-flow client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

#![deny(unsafe_code)]

//! # TeamSync Auth
//!
//! Lets the TeamSync editor extension sign in without typing credentials into
//! the editor. The extension asks for a device code, the user approves the
//! short user code in a browser session, and the extension's next poll
//! receives an access and refresh token pair.
//!
//! ## Architecture
//!
//! - **Store**: TTL-bounded key/value records (in-memory or Redis)
//! - **Device**: the broker that issues, approves, and consumes device codes
//! - **Auth**: signed access and refresh tokens plus revocation
//! - **`OAuth2` client**: Google and GitHub login for the web console
//! - **Routes / Server**: the axum HTTP surface
//! - **Client**: the polling client used by the extension and `teamsync-cli`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use teamsync::config::ServerConfig;
//! use teamsync::server::ServerResources;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = ServerResources::initialize(config).await?;
//!     println!("store backend: {}", resources.store.backend());
//!     Ok(())
//! }
//! ```

/// Access and refresh token minting, verification, and revocation
pub mod auth;

/// Device-flow client: API calls, token persistence, and the login session
pub mod client;

/// Environment-driven server configuration
pub mod config;

/// Device authorization broker and code generation
pub mod device;

/// Wire-level error taxonomy of the auth endpoints
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Bearer authentication, CORS, and rate limiting layers
pub mod middleware;

/// OAuth provider client for console login
pub mod oauth2_client;

/// HTTP route groups
pub mod routes;

/// Shared resources and the HTTP server loop
pub mod server;

/// Ephemeral TTL key/value store
pub mod store;

/// User accounts
pub mod users;

/// Shared HTTP client construction
pub mod utils;

pub use teamsync_core::{constants, models};
