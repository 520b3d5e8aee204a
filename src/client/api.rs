// ABOUTME: reqwest wrapper for the device flow and token endpoints
// ABOUTME: Decodes OAuth-style error bodies into poll outcomes and typed client errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use crate::utils::http_client::api_client;
use reqwest::{Response, StatusCode};
use teamsync_core::models::{
    DeviceCodeRequest, DeviceCodeResponse, OAuthErrorBody, RevokeRequest,
    TokenGrant, TokenResponse,
};
use thiserror::Error;

/// Failure talking to the authorization service
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, timeout, or body read failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with an error body
    #[error("server rejected the request ({status}): {error}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// OAuth-style error code
        error: String,
        /// Optional human-readable detail
        description: Option<String>,
    },

    /// The server answered with something this client does not understand
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// Reading or writing persisted tokens failed
    #[error("token storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Worth retrying on the next tick: network trouble, overload, or 5xx
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Protocol(_) | Self::Storage(_) => false,
        }
    }

    /// The server definitively refused the credential
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status >= 400 && *status < 500 && *status != 429)
    }
}

/// Client view of one `POST /auth/token` device-code poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Tokens issued
    Issued(TokenResponse),
    /// Not approved yet
    Pending,
    /// Polling too fast; back off
    SlowDown,
    /// Code expired or already consumed
    Expired,
    /// Approval refused
    Denied,
}

/// HTTP client for the authorization endpoints
#[derive(Debug, Clone)]
pub struct AuthApi {
    base_url: String,
    client: reqwest::Client,
}

impl AuthApi {
    /// Client for the service at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, api_client())
    }

    /// Client with a caller-supplied `reqwest::Client`
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, client }
    }

    /// Service base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `POST /auth/device`
    ///
    /// # Errors
    ///
    /// Network failure or a rejected client id
    pub async fn request_device_code(&self, client_id: &str) -> Result<DeviceCodeResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/auth/device"))
            .json(&DeviceCodeRequest {
                client_id: client_id.to_owned(),
            })
            .send()
            .await?;
        json_or_rejection(response).await
    }

    /// `POST /auth/token` with the device code grant
    ///
    /// # Errors
    ///
    /// Network failure, or an error code that is not a poll state
    pub async fn poll_token(&self, device_code: &str) -> Result<PollOutcome, ClientError> {
        let response = self
            .client
            .post(self.url("/auth/token"))
            .json(&TokenGrant::DeviceCode {
                device_code: device_code.to_owned(),
            })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(PollOutcome::Issued(response.json().await?));
        }

        match into_rejection(response).await {
            ClientError::Rejected { error, .. } if error == "authorization_pending" => {
                Ok(PollOutcome::Pending)
            }
            ClientError::Rejected { error, .. } if error == "slow_down" => Ok(PollOutcome::SlowDown),
            ClientError::Rejected { error, .. } if error == "expired_token" => Ok(PollOutcome::Expired),
            ClientError::Rejected { error, .. } if error == "access_denied" => Ok(PollOutcome::Denied),
            other => Err(other),
        }
    }

    /// `POST /auth/token` with the refresh token grant
    ///
    /// # Errors
    ///
    /// Network failure or `invalid_grant`
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/auth/token"))
            .json(&TokenGrant::RefreshToken {
                refresh_token: refresh_token.to_owned(),
            })
            .send()
            .await?;
        json_or_rejection(response).await
    }

    /// `POST /auth/revoke`, authenticated with the access token
    ///
    /// # Errors
    ///
    /// Network failure or a rejected bearer token
    pub async fn revoke(&self, access_token: &str, token: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/auth/revoke"))
            .bearer_auth(access_token)
            .json(&RevokeRequest {
                token: token.to_owned(),
            })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(into_rejection(response).await)
        }
    }
}

async fn json_or_rejection<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        Err(into_rejection(response).await)
    }
}

async fn into_rejection(response: Response) -> ClientError {
    let status = response.status();
    match response.json::<OAuthErrorBody>().await {
        Ok(body) => ClientError::Rejected {
            status: status.as_u16(),
            error: body.error,
            description: body.error_description,
        },
        Err(_) if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
            ClientError::Rejected {
                status: status.as_u16(),
                error: "server_error".into(),
                description: None,
            }
        }
        Err(_) => ClientError::Protocol(format!("status {status} without an error body")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(status: u16) -> ClientError {
        ClientError::Rejected {
            status,
            error: "x".into(),
            description: None,
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(rejected(503).is_transient());
        assert!(rejected(429).is_transient());
        assert!(!rejected(401).is_transient());
        assert!(rejected(401).is_rejection());
        assert!(!rejected(429).is_rejection());
        assert!(!ClientError::Protocol("?".into()).is_transient());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = AuthApi::new("http://localhost:8080/");
        assert_eq!(api.url("/auth/device"), "http://localhost:8080/auth/device");
    }
}
