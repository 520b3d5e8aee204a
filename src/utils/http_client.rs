// ABOUTME: reqwest client builders with per-use timeouts
// ABOUTME: One client for provider OAuth calls and one for the CLI's calls to the API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Client with custom request and connect timeouts
///
/// Falls back to reqwest defaults if the TLS backend cannot be initialized with
/// the requested settings.
#[must_use]
pub fn client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Client for provider token exchanges and profile fetches
#[must_use]
pub fn oauth_client() -> Client {
    client_with_timeout(15, 5)
}

/// Client for the device flow endpoints, short enough that one slow poll does
/// not stall the interval
#[must_use]
pub fn api_client() -> Client {
    client_with_timeout(20, 5)
}
