// ABOUTME: Bearer authentication middleware for protected auth endpoints
// ABOUTME: Verifies the access token, loads the user, and injects it into request extensions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use crate::auth::AccessClaims;
use crate::errors::AuthFlowError;
use crate::server::ServerResources;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use teamsync_core::models::User;
use tracing::debug;

/// Authenticated caller, inserted by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Current account record
    pub user: User,
    /// Verified access token claims
    pub claims: AccessClaims,
}

/// Extract the token from `Authorization: Bearer <token>`
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty())
}

/// Reject requests without a valid access token for an existing user
///
/// An expired token yields `TokenExpired` so clients know to refresh rather
/// than log in again.
///
/// # Errors
///
/// `Unauthorized` when the header is missing or the user is gone;
/// `InvalidToken` or `TokenExpired` from verification
pub async fn require_auth(
    State(resources): State<Arc<ServerResources>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthFlowError> {
    let claims = {
        let token = bearer_token(req.headers()).ok_or(AuthFlowError::Unauthorized)?;
        resources.tokens.verify_access(token)?
    };

    let Some(user) = resources.users.find_by_id(&claims.sub).await? else {
        debug!(user.id = %claims.sub, "Access token for a deleted user");
        return Err(AuthFlowError::Unauthorized);
    };

    tracing::Span::current().record("user_id", user.id.as_str());
    req.extensions_mut().insert(AuthUser { user, claims });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
