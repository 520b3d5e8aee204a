// ABOUTME: Store factory selecting the in-memory or Redis backend from configuration
// ABOUTME: Gives the rest of the server a single concrete store type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::{EphemeralStore, InMemoryStore, RedisStore, StoreConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use teamsync_core::errors::AppResult;
use tracing::info;

/// Ephemeral store with the backend chosen at startup
#[derive(Clone)]
pub enum Store {
    /// Process-local backend
    Memory(InMemoryStore),
    /// Shared Redis backend
    Redis(RedisStore),
}

impl Store {
    /// Build the backend named by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if Redis is configured but unreachable
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        if config.redis_url.is_some() {
            info!("Initializing Redis code store");
            Ok(Self::Redis(RedisStore::connect(config).await?))
        } else {
            info!(
                "Initializing in-memory code store (max_entries={})",
                config.max_entries
            );
            Ok(Self::Memory(InMemoryStore::new(config)))
        }
    }

    /// In-memory store without a sweep task
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(InMemoryStore::without_cleanup())
    }

    /// Backend name for health reporting
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }
}

#[async_trait::async_trait]
impl EphemeralStore for Store {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.set(key, value, ttl).await,
            Self::Redis(store) => store.set(key, value, ttl).await,
        }
    }

    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>> {
        match self {
            Self::Memory(store) => store.get(key).await,
            Self::Redis(store) => store.get(key).await,
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.delete(key).await,
            Self::Redis(store) => store.delete(key).await,
        }
    }

    async fn take<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>> {
        match self {
            Self::Memory(store) => store.take(key).await,
            Self::Redis(store) => store.take(key).await,
        }
    }

    async fn insert_if_absent<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<bool> {
        match self {
            Self::Memory(store) => store.insert_if_absent(key, value, ttl).await,
            Self::Redis(store) => store.insert_if_absent(key, value, ttl).await,
        }
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        match self {
            Self::Memory(store) => store.ttl(key).await,
            Self::Redis(store) => store.ttl(key).await,
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.health_check().await,
            Self::Redis(store) => store.health_check().await,
        }
    }
}
