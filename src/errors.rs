// ABOUTME: Authorization-flow error taxonomy with OAuth-style wire mapping
// ABOUTME: Maps each outcome to an `error` code, description, and HTTP status
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! # Authorization Flow Errors
//!
//! Every failure the device flow, the token codec, and the identity bridge can
//! report. Protocol outcomes (`authorization_pending`, `expired_token`, ...) are
//! ordinary values here; infrastructure failures are wrapped as
//! [`AuthFlowError::Internal`] and rendered as `server_error` without leaking
//! their message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use teamsync_core::errors::AppError;
use teamsync_core::models::OAuthErrorBody;
use thiserror::Error;

/// Errors surfaced by the authorization endpoints
#[derive(Debug, Error)]
pub enum AuthFlowError {
    /// `client_id` is not the recognized extension id
    #[error("unknown client id")]
    InvalidClient,

    /// No live authorization carries this user code
    #[error("user code is invalid or has expired")]
    InvalidUserCode,

    /// Device code not approved yet; clients keep polling
    #[error("authorization pending")]
    AuthorizationPending,

    /// Device code expired, was consumed, or never existed
    #[error("device code has expired")]
    ExpiredToken,

    /// The approving account cannot be loaded
    #[error("authorization was denied")]
    AccessDenied,

    /// Access token signature, structure, or type is wrong
    #[error("invalid access token")]
    InvalidToken,

    /// Access token is past its expiry
    #[error("access token has expired")]
    TokenExpired,

    /// Refresh token is invalid, expired, spent, or revoked
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// The token subject no longer exists
    #[error("user no longer exists")]
    UnknownUser,

    /// Provider is not one of the supported providers, or is not configured
    #[error("unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),

    /// Upstream OAuth call failed
    #[error("OAuth provider error: {0}")]
    ProviderError(String),

    /// Missing or unusable bearer credentials
    #[error("authentication required")]
    Unauthorized,

    /// Request body failed validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// `grant_type` is not one of the supported grants
    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// Caller exceeded the per-IP limit
    #[error("too many requests, retry in {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window resets
        retry_after_secs: u64,
    },

    /// Store, database, or other infrastructure failure
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl AuthFlowError {
    /// OAuth `error` code for the wire
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::InvalidUserCode => "invalid_user_code",
            Self::AuthorizationPending => "authorization_pending",
            Self::ExpiredToken => "expired_token",
            Self::AccessDenied => "access_denied",
            Self::InvalidToken | Self::TokenExpired | Self::Unauthorized => "invalid_token",
            Self::InvalidRefreshToken | Self::UnknownUser => "invalid_grant",
            Self::UnsupportedProvider(_) => "unsupported_provider",
            Self::ProviderError(_) => "provider_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::RateLimited { .. } => "rate_limited",
            Self::Internal(_) => "server_error",
        }
    }

    /// HTTP status for the wire
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidClient
            | Self::InvalidUserCode
            | Self::AuthorizationPending
            | Self::ExpiredToken
            | Self::AccessDenied
            | Self::UnsupportedProvider(_)
            | Self::InvalidRequest(_)
            | Self::UnsupportedGrantType(_) => StatusCode::BAD_REQUEST,
            Self::InvalidToken
            | Self::TokenExpired
            | Self::Unauthorized
            | Self::InvalidRefreshToken
            | Self::UnknownUser => StatusCode::UNAUTHORIZED,
            Self::ProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a client should keep polling after this error
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::AuthorizationPending)
    }

    /// Wire body; internal details are replaced with a generic message
    #[must_use]
    pub fn to_body(&self) -> OAuthErrorBody {
        let description = match self {
            Self::Internal(_) => "internal server error".to_owned(),
            Self::TokenExpired => "access token has expired, refresh and retry".to_owned(),
            other => other.to_string(),
        };
        OAuthErrorBody {
            error: self.error_code().to_owned(),
            error_description: Some(description),
        }
    }
}

impl IntoResponse for AuthFlowError {
    fn into_response(self) -> Response {
        if let Self::Internal(inner) = &self {
            tracing::error!(code = ?inner.code, "Authorization request failed: {}", inner.message);
        }
        let mut response = (self.status(), Json(self.to_body())).into_response();
        if let Self::RateLimited { retry_after_secs } = &self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        if matches!(self, Self::TokenExpired) {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static(
                    "Bearer error=\"invalid_token\", error_description=\"token expired\"",
                ),
            );
        }
        response
    }
}

/// Result alias for authorization handlers and services
pub type AuthFlowResult<T> = Result<T, AuthFlowError>;
