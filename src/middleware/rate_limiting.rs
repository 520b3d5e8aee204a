// ABOUTME: Per-client fixed-window rate limiting for unauthenticated auth endpoints
// ABOUTME: Counts requests per client IP and rejects with 429 and Retry-After once over the limit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! # Auth Endpoint Rate Limiting
//!
//! Guards code issuance, OAuth callbacks, and refresh against brute force.
//! Device-token polling is not limited here; its pace is set by the `interval`
//! returned with the device code.

use crate::config::RateLimitConfig;
use crate::errors::AuthFlowError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// HTTP header names for rate limiting
pub mod headers {
    /// Maximum requests allowed in the window
    pub const X_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
    /// Requests left in the current window
    pub const X_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Result of admitting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Admitted with this many requests left
    Allowed {
        /// Requests left in the window
        remaining: u32,
    },
    /// Rejected until the window resets
    Limited {
        /// Seconds until the window resets, at least 1
        retry_after_secs: u64,
    },
}

/// Fixed-window counter keyed by client address
#[derive(Debug)]
pub struct AuthRateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl AuthRateLimiter {
    /// Create a limiter from configuration
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window,
            windows: DashMap::new(),
        }
    }

    /// Configured request ceiling per window
    #[must_use]
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count one request from `client`
    pub fn check(&self, client: &str) -> RateDecision {
        let now = Instant::now();
        let mut entry = self.windows.entry(client.to_owned()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            let elapsed = now.duration_since(entry.started);
            let retry_after_secs = self.window.saturating_sub(elapsed).as_secs().max(1);
            return RateDecision::Limited { retry_after_secs };
        }

        entry.count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    /// Drop windows that have fully elapsed
    pub fn prune(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
    }
}

/// Client key: socket peer when known, else the first `X-Forwarded-For` hop
fn client_key(connect_info: Option<&SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(addr) = connect_info {
        return addr.ip().to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_owned()
}

/// Reject requests over the per-client limit
///
/// # Errors
///
/// `RateLimited` with the seconds until the window resets
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<AuthRateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Result<Response, AuthFlowError> {
    let client = client_key(connect_info.as_ref().map(|c| &c.0), req.headers());

    match limiter.check(&client) {
        RateDecision::Limited { retry_after_secs } => {
            warn!(client = %client, path = %req.uri().path(), "Auth rate limit exceeded");
            Err(AuthFlowError::RateLimited { retry_after_secs })
        }
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            let response_headers = response.headers_mut();
            response_headers.insert(
                headers::X_RATE_LIMIT_LIMIT,
                HeaderValue::from(limiter.max_requests()),
            );
            response_headers.insert(headers::X_RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> AuthRateLimiter {
        AuthRateLimiter::new(&RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_resets_after_window() {
        let limiter = limiter(2);
        assert_eq!(limiter.check("10.0.0.1"), RateDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check("10.0.0.1"), RateDecision::Allowed { remaining: 0 });
        assert_eq!(
            limiter.check("10.0.0.1"),
            RateDecision::Limited { retry_after_secs: 60 }
        );
        // Other clients are counted separately
        assert_eq!(limiter.check("10.0.0.2"), RateDecision::Allowed { remaining: 1 });

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.check("10.0.0.1"), RateDecision::Allowed { remaining: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_drops_elapsed_windows() {
        let limiter = limiter(5);
        limiter.check("a");
        tokio::time::advance(Duration::from_secs(120)).await;
        limiter.check("b");
        limiter.prune();
        assert_eq!(limiter.windows.len(), 1);
    }

    #[test]
    fn test_client_key_prefers_socket_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        let addr: SocketAddr = "192.0.2.1:4000".parse().unwrap();

        assert_eq!(client_key(Some(&addr), &headers), "192.0.2.1");
        assert_eq!(client_key(None, &headers), "203.0.113.9");
        assert_eq!(client_key(None, &HeaderMap::new()), "unknown");
    }
}
