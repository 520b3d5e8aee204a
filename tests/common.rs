// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides quiet logging, test configuration, and in-memory server resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync
#![allow(
    dead_code,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `teamsync`

use std::sync::{Arc, Once};
use teamsync::{
    config::{
        AuthConfig, DeviceFlowConfig, Environment, OAuthConfig, RateLimitConfig, ServerConfig,
    },
    oauth2_client::IdentityBridge,
    server::ServerResources,
    store::{InMemoryStore, Store, StoreConfig},
    users::{InMemoryUserRepository, UserRepository},
};
use teamsync::models::{AccountProvider, User};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Configuration with fixed secrets and no external services
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        environment: Environment::Testing,
        auth: AuthConfig::new("test-access-secret", "test-refresh-secret"),
        device: DeviceFlowConfig::new("http://localhost:3000"),
        store: StoreConfig::default(),
        database_url: "sqlite::memory:".into(),
        oauth: OAuthConfig {
            default_redirect_uri: "http://localhost:3000/auth/callback".into(),
            ..OAuthConfig::default()
        },
        cors_allowed_origins: vec!["*".into()],
        rate_limit: RateLimitConfig::default(),
    }
}

/// Resources plus handles to the in-memory backends behind them
pub struct TestContext {
    pub resources: Arc<ServerResources>,
    pub store: InMemoryStore,
    pub users: Arc<InMemoryUserRepository>,
}

/// In-memory resources for `config`
pub fn test_context_with(config: ServerConfig) -> TestContext {
    init_test_logging();
    let store = InMemoryStore::new(&StoreConfig {
        enable_background_cleanup: false,
        ..config.store.clone()
    });
    let users = Arc::new(InMemoryUserRepository::new());
    let oauth = IdentityBridge::new(config.oauth.clone());
    let resources = ServerResources::new(
        config,
        Store::Memory(store.clone()),
        users.clone() as Arc<dyn UserRepository>,
        oauth,
    )
    .unwrap();

    TestContext {
        resources: Arc::new(resources),
        store,
        users,
    }
}

/// In-memory resources with the default test configuration
pub fn test_context() -> TestContext {
    test_context_with(test_config())
}

/// Insert an account with a fixed id
pub async fn create_user(users: &InMemoryUserRepository, id: &str, email: &str) -> User {
    let mut user = User::new(email, "Test User", AccountProvider::Email);
    user.id = id.to_owned();
    users.create(&user).await.unwrap();
    user
}
