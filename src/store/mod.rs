// ABOUTME: Ephemeral code store abstraction with pluggable backends
// ABOUTME: Time-expiring key-value storage for device authorizations and token bookkeeping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! Ephemeral key-value storage with TTL.
//!
//! Every record written here expires on its own. Readers must treat an expired
//! record exactly like a missing one. Besides plain `set`/`get`/`delete`, the
//! store offers two atomic primitives the device flow depends on:
//!
//! - [`EphemeralStore::take`] removes and returns a record in one step, so two
//!   concurrent callers can never both observe it.
//! - [`EphemeralStore::insert_if_absent`] reserves a key only if no live record
//!   holds it.

/// Store selection from configuration
pub mod factory;
/// In-memory LRU backend
pub mod memory;
/// Redis backend
pub mod redis;

pub use factory::Store;
pub use memory::InMemoryStore;
pub use self::redis::RedisStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use teamsync_core::errors::AppResult;

/// Redis connection tuning
#[derive(Debug, Clone)]
pub struct RedisConnectionConfig {
    /// Timeout for establishing a connection
    pub connection_timeout_secs: u64,
    /// Timeout for a single command
    pub response_timeout_secs: u64,
    /// Attempts made at startup before giving up
    pub initial_connection_retries: u32,
    /// First backoff delay at startup
    pub initial_retry_delay_ms: u64,
    /// Backoff ceiling
    pub max_retry_delay_ms: u64,
    /// Reconnection attempts made by the connection manager
    pub reconnection_retries: usize,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 5,
            response_timeout_secs: 2,
            initial_connection_retries: 3,
            initial_retry_delay_ms: 250,
            max_retry_delay_ms: 4_000,
            reconnection_retries: 6,
        }
    }
}

/// Ephemeral store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL; the in-memory backend is used when `None`
    pub redis_url: Option<String>,
    /// Capacity of the in-memory backend
    pub max_entries: usize,
    /// Sweep interval for expired in-memory entries
    pub cleanup_interval: Duration,
    /// Whether the in-memory backend runs its sweep task
    pub enable_background_cleanup: bool,
    /// Redis connection settings
    pub redis_connection: RedisConnectionConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_entries: 10_000,
            cleanup_interval: Duration::from_secs(60),
            enable_background_cleanup: true,
            redis_connection: RedisConnectionConfig::default(),
        }
    }
}

/// Time-expiring key-value store
///
/// Values are JSON encoded. Implementations must make `take` and
/// `insert_if_absent` atomic with respect to every other operation on the
/// same key.
#[async_trait::async_trait]
pub trait EphemeralStore: Send + Sync + Clone {
    /// Store `value` under `key` for `ttl`, replacing any previous record
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or the backend fails
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()>;

    /// Read a live record
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be decoded or the backend fails
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>>;

    /// Remove a record; removing a missing key is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Atomically read and remove a live record
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be decoded or the backend fails
    async fn take<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>>;

    /// Store `value` only if no live record holds `key`; returns whether it was stored
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or the backend fails
    async fn insert_if_absent<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<bool>;

    /// Remaining lifetime of a live record
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>>;

    /// Check backend connectivity
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn health_check(&self) -> AppResult<()>;
}
