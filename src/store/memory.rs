// ABOUTME: In-memory ephemeral store with bounded capacity and TTL support
// ABOUTME: Includes background cleanup task for expired entries; live records are never evicted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::{EphemeralStore, StoreConfig};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use teamsync_core::errors::{AppError, AppResult};
use tokio::sync::RwLock;
use tokio::time::Instant;

/// In-memory store entry with expiration
#[derive(Debug, Clone)]
struct StoreEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl StoreEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at.checked_duration_since(Instant::now())
    }
}

type Entries = Arc<RwLock<LruCache<String, StoreEntry>>>;

/// Process-local store with bounded capacity and background cleanup
///
/// Expiry is checked on every read, so correctness never depends on the sweep
/// task; the sweep only reclaims memory. A live record is never evicted: spent
/// refresh tokens and revoke-all cutoffs live here too. When the store is full,
/// writing a new key first drops expired entries and fails with a storage error
/// if none were expired. Time comes from `tokio::time`, which
/// lets tests drive expiry with a paused clock.
///
/// Suitable for a single server instance. Multiple instances must share the
/// Redis backend.
#[derive(Clone)]
pub struct InMemoryStore {
    entries: Entries,
    shutdown_tx: Option<Arc<tokio::sync::mpsc::Sender<()>>>,
}

impl InMemoryStore {
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a store, spawning the sweep task when enabled
    ///
    /// Must be called from within a tokio runtime when background cleanup is enabled.
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        let entries: Entries = Arc::new(RwLock::new(LruCache::new(capacity)));

        let shutdown_tx = if config.enable_background_cleanup {
            let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
            let sweep_entries = entries.clone();
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::cleanup_expired(&sweep_entries).await;
                        }
                        _ = shutdown_rx.recv() => {
                            tracing::debug!("Code store cleanup task stopped");
                            break;
                        }
                    }
                }
            });

            Some(Arc::new(shutdown_tx))
        } else {
            None
        };

        Self {
            entries,
            shutdown_tx,
        }
    }

    /// Store without a sweep task, for tests and short-lived tools
    #[must_use]
    pub fn without_cleanup() -> Self {
        Self::new(&StoreConfig {
            enable_background_cleanup: false,
            ..StoreConfig::default()
        })
    }

    /// Stop the sweep task early; it also stops when the last clone is dropped
    pub async fn shutdown(&self) {
        if let Some(tx) = &self.shutdown_tx {
            // A closed channel means the task already exited
            let _ = tx.send(()).await;
        }
    }

    /// Number of entries currently held, including expired ones not yet swept
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no entries are held
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn cleanup_expired(entries: &Entries) {
        let mut guard = entries.write().await;

        let expired_keys: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            guard.pop(key);
        }
        drop(guard);

        if !expired_keys.is_empty() {
            tracing::debug!("Swept {} expired code store entries", expired_keys.len());
        }
    }

    /// Make room for `key`, dropping only expired entries
    fn admit(entries: &mut LruCache<String, StoreEntry>, key: &str) -> AppResult<()> {
        if entries.contains(key) || entries.len() < entries.cap().get() {
            return Ok(());
        }

        let expired_keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for expired in &expired_keys {
            entries.pop(expired);
        }

        if entries.len() < entries.cap().get() {
            return Ok(());
        }
        tracing::warn!(
            capacity = entries.cap().get(),
            "Code store full of live records, rejecting write"
        );
        Err(AppError::storage("Code store is at capacity"))
    }

    fn encode<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| AppError::serialization(format!("Store serialization failed: {e}")))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> AppResult<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| AppError::serialization(format!("Store deserialization failed: {e}")))
    }
}

#[async_trait::async_trait]
impl EphemeralStore for InMemoryStore {
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let entry = StoreEntry::new(Self::encode(value)?, ttl);
        let mut entries = self.entries.write().await;
        Self::admit(&mut entries, key)?;
        entries.push(key.to_owned(), entry);
        Ok(())
    }

    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>> {
        // LruCache::get updates recency, so it needs the write lock
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.pop(key);
                Ok(None)
            }
            Some(entry) => Self::decode(&entry.data).map(Some),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.pop(key);
        Ok(())
    }

    async fn take<T: DeserializeOwned + Send>(&self, key: &str) -> AppResult<Option<T>> {
        let entry = self.entries.write().await.pop(key);
        match entry {
            Some(entry) if !entry.is_expired() => Self::decode(&entry.data).map(Some),
            _ => Ok(None),
        }
    }

    async fn insert_if_absent<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<bool> {
        let data = Self::encode(value)?;
        let mut entries = self.entries.write().await;
        if entries.peek(key).is_some_and(|entry| !entry.is_expired()) {
            return Ok(false);
        }
        Self::admit(&mut entries, key)?;
        entries.push(key.to_owned(), StoreEntry::new(data, ttl));
        Ok(true)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<Duration>> {
        let entries = self.entries.read().await;
        Ok(entries
            .peek(key)
            .filter(|entry| !entry.is_expired())
            .and_then(StoreEntry::remaining_ttl))
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = InMemoryStore::without_cleanup();
        store
            .set("k", &"v".to_owned(), Duration::from_secs(10))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.get::<String>("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get::<String>("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_if_absent_reclaims_expired_key() {
        let store = InMemoryStore::without_cleanup();
        assert!(store
            .insert_if_absent("k", &1u8, Duration::from_secs(5))
            .await
            .unwrap());
        assert!(!store
            .insert_if_absent("k", &2u8, Duration::from_secs(5))
            .await
            .unwrap());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(store
            .insert_if_absent("k", &3u8, Duration::from_secs(5))
            .await
            .unwrap());
        assert_eq!(store.get::<u8>("k").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_take_removes_record() {
        let store = InMemoryStore::without_cleanup();
        store.set("k", &7u32, Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.take::<u32>("k").await.unwrap(), Some(7));
        assert_eq!(store.take::<u32>("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    fn bounded(max_entries: usize) -> InMemoryStore {
        InMemoryStore::new(&StoreConfig {
            max_entries,
            enable_background_cleanup: false,
            ..StoreConfig::default()
        })
    }

    #[tokio::test]
    async fn test_full_store_keeps_live_records() {
        let store = bounded(3);
        for key in ["a", "b", "c"] {
            store.set(key, &1u8, Duration::from_secs(60)).await.unwrap();
        }

        let err = store
            .set("d", &1u8, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert_eq!(err.code, teamsync_core::errors::ErrorCode::StorageError);
        assert!(store
            .insert_if_absent("d", &1u8, Duration::from_secs(60))
            .await
            .is_err());

        for key in ["a", "b", "c"] {
            assert_eq!(store.get::<u8>(key).await.unwrap(), Some(1), "{key}");
        }
        // Overwriting an existing key needs no room
        store.set("a", &2u8, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get::<u8>("a").await.unwrap(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_store_reclaims_expired_records() {
        let store = bounded(2);
        store.set("short", &1u8, Duration::from_secs(5)).await.unwrap();
        store.set("long", &1u8, Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        store.set("new", &1u8, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get::<u8>("long").await.unwrap(), Some(1));
        assert_eq!(store.get::<u8>("new").await.unwrap(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_reclaims_memory() {
        let store = InMemoryStore::new(&StoreConfig {
            cleanup_interval: Duration::from_secs(1),
            ..StoreConfig::default()
        });
        store.set("k", &1u8, Duration::from_millis(500)).await.unwrap();
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.len().await, 0);
        store.shutdown().await;
    }
}
