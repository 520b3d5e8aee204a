// ABOUTME: Health check route reporting service and code store status
// ABOUTME: Always answers 200 so load balancers see the process, with store state in the body
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use crate::server::ServerResources;
use crate::store::EphemeralStore;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .with_state(resources)
    }

    async fn handle_health(State(resources): State<Arc<ServerResources>>) -> Json<Value> {
        let store = match resources.store.health_check().await {
            Ok(()) => "ok",
            Err(e) => {
                warn!("Code store health check failed: {}", e);
                "degraded"
            }
        };

        Json(json!({
            "status": "ok",
            "store": store,
            "store_backend": resources.store.backend(),
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}
