// ABOUTME: Redis ephemeral store with connection manager and native TTLs
// ABOUTME: Shares device authorizations across server instances
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::{EphemeralStore, RedisConnectionConfig, StoreConfig};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use teamsync_core::constants::keys::STORE_KEY_PREFIX;
use teamsync_core::errors::{AppError, AppResult};
use tracing::{error, info, warn};

/// Redis store with automatic reconnection
///
/// All keys are prefixed with `teamsync:`. Expiry is delegated to Redis, and
/// `take`/`insert_if_absent` map onto `GETDEL` and `SET NX PX`, both atomic on
/// the server. Requires Redis 6.2 or newer for `GETDEL`.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect using `config.redis_url`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is missing or Redis stays unreachable after retries
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let redis_url = config
            .redis_url
            .as_ref()
            .ok_or_else(|| AppError::config("Redis URL is required for Redis store backend"))?;

        let conn_config = &config.redis_connection;
        info!(
            "Connecting to Redis (timeout={}s, response_timeout={}s, retries={})",
            conn_config.connection_timeout_secs,
            conn_config.response_timeout_secs,
            conn_config.initial_connection_retries
        );

        let client = redis::Client::open(redis_url.as_str())
            .map_err(|e| AppError::config(format!("Invalid Redis URL: {e}")))?;
        let manager = Self::connect_with_retry(&client, conn_config).await?;

        info!("Successfully connected to Redis");
        Ok(Self { manager })
    }

    /// Connect with exponential backoff
    async fn connect_with_retry(
        client: &redis::Client,
        conn_config: &RedisConnectionConfig,
    ) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries);

        let max_retries = conn_config.initial_connection_retries;
        let mut delay_ms = conn_config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms,
                            e
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(conn_config.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::storage(format!(
            "Failed to connect to Redis after {} attempts: {}",
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }

    fn build_key(key: &str) -> String {
        format!("{STORE_KEY_PREFIX}{key}")
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        // PX 0 is rejected by Redis
        u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
    }

    fn command_error(op: &str, e: &redis::RedisError) -> AppError {
        error!("Redis {} failed: {}", op, e);
        AppError::storage(format!("Redis {op} failed: {e}"))
    }

    fn decode<T: DeserializeOwned>(bytes: Option<Vec<u8>>) -> AppResult<Option<T>> {
        bytes
            .map(|bytes| {
                serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::serialization(format!("Store deserialization failed: {e}"))
                })
            })
            .transpose()
    }

    fn encode<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| AppError::serialization(format!("Store serialization failed: {e}")))
    }
}

#[async_trait::async_trait]
impl EphemeralStore for RedisStore {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let serialized = Self::encode(value)?;
        let mut conn = self.manager.clone();
        conn.pset_ex::<_, _, ()>(Self::build_key(key), serialized, Self::ttl_millis(ttl))
            .await
            .map_err(|e| Self::command_error("PSETEX", &e))
    }

    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.manager.clone();
        let data: Option<Vec<u8>> = conn
            .get(Self::build_key(key))
            .await
            .map_err(|e| Self::command_error("GET", &e))?;
        Self::decode(data)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(Self::build_key(key))
            .await
            .map_err(|e| Self::command_error("DEL", &e))
    }

    async fn take<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.manager.clone();
        let data: Option<Vec<u8>> = redis::cmd("GETDEL")
            .arg(Self::build_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::command_error("GETDEL", &e))?;
        Self::decode(data)
    }

    async fn insert_if_absent<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<bool> {
        let serialized = Self::encode(value)?;
        let mut conn = self.manager.clone();
        // Nil reply means the key was already held
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::build_key(key))
            .arg(serialized)
            .arg("NX")
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::command_error("SET NX", &e))?;
        Ok(reply.is_some())
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let mut conn = self.manager.clone();
        let ttl_ms: i64 = conn
            .pttl(Self::build_key(key))
            .await
            .map_err(|e| Self::command_error("PTTL", &e))?;

        // -2: missing key, -1: no expiry (never written by this store)
        Ok(u64::try_from(ttl_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis))
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::command_error("PING", &e))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::storage(format!(
                "Unexpected PING response '{response}'"
            )))
        }
    }
}
