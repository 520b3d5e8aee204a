// ABOUTME: HTTP handlers for the device flow, token lifecycle, and OAuth login
// ABOUTME: Validates raw request bodies into typed requests before they reach the services
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! Authentication routes
//!
//! Bodies are taken as raw bytes and validated here so malformed input gets the
//! same `{error, error_description}` shape as every other failure.

use crate::device::PollOutcome;
use crate::errors::{AuthFlowError, AuthFlowResult};
use crate::logging::AuthLogger;
use crate::middleware::{rate_limit_middleware, require_auth, AuthUser};
use crate::server::ServerResources;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use teamsync_core::models::{
    ApproveRequest, DeviceCodeRequest, RefreshRequest, RevokeRequest, TokenGrant, TokenResponse,
    UserResponse, DEVICE_CODE_GRANT, DEVICE_CODE_GRANT_URN, REFRESH_TOKEN_GRANT,
};

/// Query of `GET /auth/oauth/:provider/url`
#[derive(Debug, Default, Deserialize)]
pub struct OAuthUrlQuery {
    /// Where the provider sends the user back
    pub redirect_uri: Option<String>,
    /// Opaque value echoed back by the provider
    pub state: Option<String>,
}

/// Response of `GET /auth/oauth/:provider/url`
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthUrlResponse {
    /// Provider authorization URL
    pub auth_url: String,
}

/// Body of `POST /auth/oauth/callback`
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    /// `google` or `github`
    pub provider: String,
    /// Authorization code from the provider redirect
    pub code: String,
    /// State echoed by the provider, verified by the web console
    pub state: Option<String>,
    /// Redirect URI used for the authorization request, when not the default
    pub redirect_uri: Option<String>,
}

/// Response of `POST /auth/oauth/callback`
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthLoginResponse {
    /// The resolved account
    pub user: UserResponse,
    /// A fresh token pair
    pub tokens: TokenResponse,
}

/// Response of `GET /auth/me`
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    /// The authenticated account
    pub user: UserResponse,
}

/// Authentication routes implementation
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        let rate_limited = Router::new()
            .route("/auth/device", post(Self::handle_device_code))
            .route("/auth/refresh", post(Self::handle_refresh))
            .route("/auth/oauth/callback", post(Self::handle_oauth_callback))
            .with_state(resources.clone())
            .layer(middleware::from_fn_with_state(
                resources.rate_limiter.clone(),
                rate_limit_middleware,
            ));

        let public = Router::new()
            .route("/auth/token", post(Self::handle_token))
            .route("/auth/oauth/:provider/url", get(Self::handle_oauth_url))
            .with_state(resources.clone());

        let protected = Router::new()
            .route("/auth/device/approve", post(Self::handle_approve))
            .route("/auth/revoke", post(Self::handle_revoke))
            .route("/auth/logout", post(Self::handle_logout))
            .route("/auth/me", get(Self::handle_me))
            .with_state(resources.clone())
            .layer(middleware::from_fn_with_state(resources, require_auth));

        Router::new().merge(rate_limited).merge(public).merge(protected)
    }

    async fn handle_device_code(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> AuthFlowResult<Json<teamsync_core::models::DeviceCodeResponse>> {
        let request: DeviceCodeRequest = parse_json(&body)?;
        let response = resources.broker.request_code(&request.client_id).await?;
        Ok(Json(response))
    }

    async fn handle_token(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> AuthFlowResult<Response> {
        match parse_token_grant(&body)? {
            TokenGrant::DeviceCode { device_code } => {
                let outcome = resources.broker.poll(&device_code).await?;
                if let PollOutcome::Issued { user_id, .. } = &outcome {
                    AuthLogger::log_auth_event(Some(user_id), "device_token_issued", true, None);
                }
                Ok(token_response(outcome.into_tokens()?.into()))
            }
            TokenGrant::RefreshToken { refresh_token } => {
                Self::rotate(&resources, &refresh_token).await
            }
        }
    }

    async fn handle_refresh(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> AuthFlowResult<Response> {
        let request: RefreshRequest = parse_json(&body)?;
        Self::rotate(&resources, &request.refresh_token).await
    }

    async fn rotate(resources: &ServerResources, refresh_token: &str) -> AuthFlowResult<Response> {
        match resources.tokens.refresh(refresh_token).await {
            Ok((pair, user)) => {
                AuthLogger::log_auth_event(Some(&user.id), "token_refreshed", true, None);
                Ok(token_response(pair.into()))
            }
            Err(e) => {
                AuthLogger::log_auth_event(None, "token_refreshed", false, Some(e.error_code()));
                Err(e)
            }
        }
    }

    async fn handle_approve(
        State(resources): State<Arc<ServerResources>>,
        Extension(auth): Extension<AuthUser>,
        body: Bytes,
    ) -> AuthFlowResult<Json<Value>> {
        let request: ApproveRequest = parse_json(&body)?;
        if let Err(e) = resources
            .broker
            .approve(&request.user_code, &auth.user.id)
            .await
        {
            AuthLogger::log_security_event(
                "device_approval_rejected",
                e.error_code(),
                Some(&auth.user.id),
            );
            return Err(e);
        }
        Ok(Json(serde_json::json!({ "success": true })))
    }

    async fn handle_revoke(
        State(resources): State<Arc<ServerResources>>,
        Extension(auth): Extension<AuthUser>,
        body: Bytes,
    ) -> AuthFlowResult<StatusCode> {
        let request: RevokeRequest = parse_json(&body)?;
        resources.tokens.revoke(&request.token, &auth.user.id).await?;
        Ok(StatusCode::NO_CONTENT)
    }

    async fn handle_logout(
        State(resources): State<Arc<ServerResources>>,
        Extension(auth): Extension<AuthUser>,
    ) -> AuthFlowResult<StatusCode> {
        resources.tokens.revoke_all(&auth.user.id).await?;
        AuthLogger::log_auth_event(Some(&auth.user.id), "logout", true, None);
        Ok(StatusCode::NO_CONTENT)
    }

    async fn handle_me(Extension(auth): Extension<AuthUser>) -> Json<MeResponse> {
        Json(MeResponse {
            user: UserResponse::from(&auth.user),
        })
    }

    async fn handle_oauth_url(
        State(resources): State<Arc<ServerResources>>,
        Path(provider): Path<String>,
        Query(query): Query<OAuthUrlQuery>,
    ) -> AuthFlowResult<Json<OAuthUrlResponse>> {
        let auth_url = resources.oauth.authorization_url(
            &provider,
            query.redirect_uri.as_deref(),
            query.state.as_deref(),
        )?;
        Ok(Json(OAuthUrlResponse { auth_url }))
    }

    async fn handle_oauth_callback(
        State(resources): State<Arc<ServerResources>>,
        body: Bytes,
    ) -> AuthFlowResult<Json<OAuthLoginResponse>> {
        let request: OAuthCallbackRequest = parse_json(&body)?;
        if request.code.trim().is_empty() {
            return Err(AuthFlowError::InvalidRequest("code is required".into()));
        }

        let identity = match resources
            .oauth
            .exchange_code_for_user(&request.provider, &request.code, request.redirect_uri.as_deref())
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                AuthLogger::log_oauth_event(None, &request.provider, "code_exchange", false);
                return Err(e);
            }
        };

        let user = resources.user_service.upsert_oauth_user(&identity).await?;
        let tokens = resources.tokens.issue(&user)?;
        AuthLogger::log_oauth_event(Some(&user.id), &request.provider, "login", true);

        Ok(Json(OAuthLoginResponse {
            user: UserResponse::from(&user),
            tokens: tokens.into(),
        }))
    }
}

/// Token responses must not be cached by intermediaries
fn token_response(tokens: TokenResponse) -> Response {
    ([(header::CACHE_CONTROL, "no-store")], Json(tokens)).into_response()
}

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> AuthFlowResult<T> {
    if body.is_empty() {
        return Err(AuthFlowError::InvalidRequest("request body is required".into()));
    }
    serde_json::from_slice(body).map_err(|e| AuthFlowError::InvalidRequest(e.to_string()))
}

/// Validate a `/auth/token` body into a grant
///
/// # Errors
///
/// `InvalidRequest` for malformed JSON or a missing field;
/// `UnsupportedGrantType` for an unknown `grant_type`
pub fn parse_token_grant(body: &Bytes) -> AuthFlowResult<TokenGrant> {
    let value: Value = parse_json(body)?;
    let grant_type = value
        .get("grant_type")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthFlowError::InvalidRequest("grant_type is required".into()))?;

    match grant_type {
        DEVICE_CODE_GRANT | DEVICE_CODE_GRANT_URN => Ok(TokenGrant::DeviceCode {
            device_code: required_field(&value, "device_code")?,
        }),
        REFRESH_TOKEN_GRANT => Ok(TokenGrant::RefreshToken {
            refresh_token: required_field(&value, "refresh_token")?,
        }),
        other => Err(AuthFlowError::UnsupportedGrantType(other.to_owned())),
    }
}

fn required_field(value: &Value, field: &str) -> AuthFlowResult<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| AuthFlowError::InvalidRequest(format!("{field} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(json: &str) -> AuthFlowResult<TokenGrant> {
        parse_token_grant(&Bytes::from(json.to_owned()))
    }

    #[test]
    fn test_parse_device_grant() {
        assert_eq!(
            grant(r#"{"grant_type":"device_code","device_code":"dc"}"#).unwrap(),
            TokenGrant::DeviceCode {
                device_code: "dc".into()
            }
        );
    }

    #[test]
    fn test_parse_grant_errors() {
        assert!(matches!(
            grant(r#"{"grant_type":"password","username":"a"}"#),
            Err(AuthFlowError::UnsupportedGrantType(g)) if g == "password"
        ));
        assert!(matches!(
            grant(r#"{"grant_type":"refresh_token"}"#),
            Err(AuthFlowError::InvalidRequest(m)) if m == "refresh_token is required"
        ));
        assert!(matches!(
            grant(r#"{"device_code":"dc"}"#),
            Err(AuthFlowError::InvalidRequest(_))
        ));
        assert!(matches!(grant("not json"), Err(AuthFlowError::InvalidRequest(_))));
        assert!(matches!(grant(""), Err(AuthFlowError::InvalidRequest(_))));
    }
}
