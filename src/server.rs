// ABOUTME: Shared server resources, router assembly, and the HTTP serve loop
// ABOUTME: Wires store, user repository, token service, broker, and OAuth bridge into axum
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! # Server
//!
//! [`ServerResources`] is built once at startup and shared behind an `Arc` by
//! every handler and middleware.

use crate::auth::{TokenCodec, TokenService};
use crate::config::ServerConfig;
use crate::device::DeviceAuthorizationBroker;
use crate::middleware::{setup_cors, AuthRateLimiter};
use crate::oauth2_client::IdentityBridge;
use crate::routes::{AuthRoutes, HealthRoutes};
use crate::store::Store;
use crate::users::{SqliteUserRepository, UserRepository, UserService};
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use teamsync_core::errors::AppResult;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Dependencies shared by all handlers
#[derive(Clone)]
pub struct ServerResources {
    /// Validated configuration
    pub config: Arc<ServerConfig>,
    /// Ephemeral code store
    pub store: Store,
    /// Account storage
    pub users: Arc<dyn UserRepository>,
    /// OAuth account resolution
    pub user_service: UserService,
    /// Token issuance, rotation, and revocation
    pub tokens: TokenService,
    /// Device authorization flow
    pub broker: DeviceAuthorizationBroker,
    /// Google and GitHub login
    pub oauth: IdentityBridge,
    /// Limiter for unauthenticated auth endpoints
    pub rate_limiter: Arc<AuthRateLimiter>,
}

impl ServerResources {
    /// Assemble resources from already-open backends
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the signing secrets are unusable
    pub fn new(
        config: ServerConfig,
        store: Store,
        users: Arc<dyn UserRepository>,
        oauth: IdentityBridge,
    ) -> AppResult<Self> {
        let codec = Arc::new(TokenCodec::new(&config.auth)?);
        let tokens = TokenService::new(codec, store.clone(), users.clone());
        let broker = DeviceAuthorizationBroker::new(
            store.clone(),
            tokens.clone(),
            users.clone(),
            config.device.clone(),
        );

        Ok(Self {
            rate_limiter: Arc::new(AuthRateLimiter::new(&config.rate_limit)),
            user_service: UserService::new(users.clone()),
            config: Arc::new(config),
            store,
            users,
            tokens,
            broker,
            oauth,
        })
    }

    /// Open the configured store and database, then assemble resources
    ///
    /// # Errors
    ///
    /// Returns an error if Redis or the database cannot be reached, or the
    /// signing secrets are unusable
    pub async fn initialize(config: ServerConfig) -> AppResult<Self> {
        let store = Store::new(&config.store).await?;
        let users = SqliteUserRepository::connect(&config.database_url).await?;
        let oauth = IdentityBridge::new(config.oauth.clone());
        info!(store = store.backend(), "Server resources initialized");
        Self::new(config, store, Arc::new(users), oauth)
    }
}

/// Build the full router with tracing and CORS
pub fn build_router(resources: &Arc<ServerResources>) -> Router {
    Router::new()
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(HealthRoutes::routes(resources.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(setup_cors(&resources.config))
}

/// Serve until `shutdown` is cancelled or the process receives Ctrl-C
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails
pub async fn run(resources: Arc<ServerResources>, shutdown: CancellationToken) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], resources.config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
    info!("HTTP server listening on {}", addr);

    let sweeper = spawn_rate_limit_pruner(resources.rate_limiter.clone(), shutdown.clone());
    let app = build_router(&resources);

    let signal_token = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::select! {
            () = signal_token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
            }
        }
        info!("Shutdown requested, draining connections");
    })
    .await
    .context("HTTP server failed")?;

    shutdown.cancel();
    sweeper.await.ok();
    info!("HTTP server stopped");
    Ok(())
}

fn spawn_rate_limit_pruner(
    limiter: Arc<AuthRateLimiter>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = interval.tick() => limiter.prune(),
            }
        }
    })
}
