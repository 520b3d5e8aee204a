// ABOUTME: Tests for the OAuth identity bridge and the console login callback
// ABOUTME: Uses wiremock stand-ins for the Google and GitHub token and profile endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::body::Body;
use axum::http::{header as http_header, Request, StatusCode};
use serde_json::{json, Value};
use teamsync::config::{OAuthConfig, OAuthProviderConfig};
use teamsync::errors::AuthFlowError;
use teamsync::models::{AccountProvider, OAuthProvider};
use teamsync::oauth2_client::IdentityBridge;
use teamsync::users::UserRepository;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_oauth_config(server: &MockServer) -> OAuthConfig {
    let mut github = OAuthProviderConfig::github("gh-client", "gh-secret");
    github.token_url = format!("{}/login/oauth/access_token", server.uri());
    github.profile_url = format!("{}/user", server.uri());
    github.emails_url = Some(format!("{}/user/emails", server.uri()));

    let mut google = OAuthProviderConfig::google("g-client", "g-secret");
    google.token_url = format!("{}/token", server.uri());
    google.profile_url = format!("{}/userinfo", server.uri());

    OAuthConfig {
        google: Some(google),
        github: Some(github),
        default_redirect_uri: "http://localhost:3000/auth/callback".into(),
    }
}

async fn mount_github_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("code=good-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_test",
            "token_type": "bearer",
            "scope": "user:email"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_github_exchange_falls_back_to_verified_email() {
    let server = MockServer::start().await;
    mount_github_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer gho_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 583_231,
            "login": "octocat",
            "name": null,
            "email": null,
            "avatar_url": "https://avatars.githubusercontent.com/u/583231"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "old@example.com", "primary": false, "verified": true},
            {"email": "octo@example.com", "primary": true, "verified": true}
        ])))
        .mount(&server)
        .await;

    let bridge = IdentityBridge::new(mock_oauth_config(&server));
    let identity = bridge
        .exchange_code_for_user("github", "good-code", None)
        .await
        .unwrap();

    assert_eq!(identity.provider, OAuthProvider::Github);
    assert_eq!(identity.provider_id, "583231");
    assert_eq!(identity.email, "octo@example.com");
    assert_eq!(identity.name, "octocat");
    assert!(identity.email_verified);
}

#[tokio::test]
async fn test_google_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1098",
            "email": "dana@gmail.com",
            "verified_email": true,
            "name": "Dana",
            "picture": "https://lh3.googleusercontent.com/a/dana"
        })))
        .mount(&server)
        .await;

    let identity = IdentityBridge::new(mock_oauth_config(&server))
        .exchange_code_for_user("google", "code", Some("http://localhost:3000/cb"))
        .await
        .unwrap();

    assert_eq!(identity.provider_id, "1098");
    assert_eq!(identity.email, "dana@gmail.com");
    assert_eq!(identity.avatar.as_deref(), Some("https://lh3.googleusercontent.com/a/dana"));
}

#[tokio::test]
async fn test_token_exchange_failure_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = IdentityBridge::new(mock_oauth_config(&server))
        .exchange_code_for_user("github", "spent-code", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::ProviderError(_)));
}

#[tokio::test]
async fn test_profile_failure_is_provider_error() {
    let server = MockServer::start().await;
    mount_github_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = IdentityBridge::new(mock_oauth_config(&server))
        .exchange_code_for_user("github", "good-code", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthFlowError::ProviderError(_)));
    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
}

fn github_callback_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/auth/oauth/callback")
        .header(http_header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"provider": "github", "code": "good-code", "state": "opaque"}).to_string(),
        ))
        .unwrap()
}

async fn mount_github_profile(server: &MockServer, public_email: Option<&str>) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "login": "dana",
            "name": "Dana",
            "email": public_email,
            "avatar_url": null
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_callback_links_existing_email_account() {
    let server = MockServer::start().await;
    mount_github_token(&server).await;
    mount_github_profile(&server, None).await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "Dana@TeamSync.dev", "primary": true, "verified": true}
        ])))
        .mount(&server)
        .await;

    let mut config = common::test_config();
    config.oauth = mock_oauth_config(&server);
    let ctx = common::test_context_with(config);
    let existing = common::create_user(&ctx.users, "u-dana", "dana@teamsync.dev").await;
    let app = teamsync::server::build_router(&ctx.resources);

    let response = app.oneshot(github_callback_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["user"]["id"], "u-dana");
    assert_eq!(body["user"]["provider"], "github");

    let access = body["tokens"]["access_token"].as_str().unwrap();
    assert_eq!(ctx.resources.tokens.verify_access(access).unwrap().sub, existing.id);

    let linked = ctx
        .users
        .find_by_provider_id(AccountProvider::Github, "7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(linked.id, "u-dana");
}

#[tokio::test]
async fn test_callback_refuses_unverified_email_match() {
    let server = MockServer::start().await;
    mount_github_token(&server).await;
    // Public profile emails carry no verification flag
    mount_github_profile(&server, Some("dana@teamsync.dev")).await;

    let mut config = common::test_config();
    config.oauth = mock_oauth_config(&server);
    let ctx = common::test_context_with(config);
    common::create_user(&ctx.users, "u-dana", "dana@teamsync.dev").await;
    let app = teamsync::server::build_router(&ctx.resources);

    let response = app.oneshot(github_callback_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "access_denied");

    assert!(ctx
        .users
        .find_by_provider_id(AccountProvider::Github, "7")
        .await
        .unwrap()
        .is_none());
}

#[test]
fn test_github_authorization_url_passes_state() {
    let bridge = IdentityBridge::new(OAuthConfig {
        google: None,
        github: Some(OAuthProviderConfig::github("gh-client", "gh-secret")),
        default_redirect_uri: "http://localhost:3000/auth/callback".into(),
    });

    let url = bridge
        .authorization_url("github", Some("http://localhost:5173/cb"), Some("s-1"))
        .unwrap();
    let parsed = url::Url::parse(&url).unwrap();
    let query: std::collections::HashMap<String, String> =
        parsed.query_pairs().into_owned().collect();

    assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
    assert_eq!(query["client_id"], "gh-client");
    assert_eq!(query["redirect_uri"], "http://localhost:5173/cb");
    assert_eq!(query["state"], "s-1");
    assert_eq!(query["scope"], "user:email");
    assert!(!query.contains_key("access_type"));
}
