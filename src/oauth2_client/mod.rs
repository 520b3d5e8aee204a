// ABOUTME: OAuth identity bridge for Google and GitHub logins
// ABOUTME: Builds authorization URLs and exchanges callback codes for normalized identities
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! # OAuth Identity Bridge
//!
//! TeamSync acts as an OAuth 2.0 client of Google and GitHub. A login is two
//! sequential calls, code for provider access token and access token for
//! profile. Neither is retried: authorization codes are single use, so the
//! caller restarts from a fresh authorization URL on any failure.

/// Identity bridge client
pub mod client;
/// Provider-specific token and profile shapes
pub mod providers;

pub use client::IdentityBridge;

use serde::{Deserialize, Serialize};
use teamsync_core::models::OAuthProvider;

/// Provider profile normalized to what TeamSync stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Provider that vouched for the identity
    pub provider: OAuthProvider,
    /// Stable account id at the provider
    pub provider_id: String,
    /// Email address
    pub email: String,
    /// Display name, falling back to the provider login or email
    pub name: String,
    /// Avatar URL
    pub avatar: Option<String>,
    /// Whether the provider verified the email
    pub email_verified: bool,
}
