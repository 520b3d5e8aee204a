// ABOUTME: Contract tests for the ephemeral code store backends
// ABOUTME: Runs against memory always and against Redis when REDIS_URL is set (CI-only)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use std::time::Duration;
use teamsync::store::{EphemeralStore, Store, StoreConfig};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Record {
    user_code: String,
    attempts: u32,
}

fn record() -> Record {
    Record {
        user_code: "ABCD-1234".into(),
        attempts: 1,
    }
}

/// Keys unique per run so parallel tests never share records in Redis
fn key(name: &str) -> String {
    format!("test:{}:{name}", Uuid::new_v4())
}

/// Memory always, plus Redis when `REDIS_URL` is set
async fn backends() -> Vec<Store> {
    let mut stores = vec![Store::memory()];
    match std::env::var("REDIS_URL") {
        Ok(redis_url) => {
            let config = StoreConfig {
                redis_url: Some(redis_url),
                enable_background_cleanup: false,
                ..StoreConfig::default()
            };
            stores.push(Store::new(&config).await.unwrap());
        }
        Err(_) => println!("REDIS_URL not set, skipping Redis store checks"),
    }
    stores
}

#[tokio::test]
async fn test_set_get_delete() {
    for store in backends().await {
        let key = key("record");
        store.set(&key, &record(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get::<Record>(&key).await.unwrap(), Some(record()), "{}", store.backend());

        let ttl = store.ttl(&key).await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(60) && ttl > Duration::from_secs(50));

        store.delete(&key).await.unwrap();
        assert_eq!(store.get::<Record>(&key).await.unwrap(), None);
        assert_eq!(store.ttl(&key).await.unwrap(), None);
        // Deleting again is fine
        store.delete(&key).await.unwrap();
    }
}

#[tokio::test]
async fn test_take_is_single_consumption() {
    for store in backends().await {
        let key = key("take");
        store.set(&key, &record(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.take::<Record>(&key).await.unwrap(), Some(record()));
        assert_eq!(store.take::<Record>(&key).await.unwrap(), None);
        assert_eq!(store.get::<Record>(&key).await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_insert_if_absent_reserves_once() {
    for store in backends().await {
        let key = key("reserve");
        assert!(store
            .insert_if_absent(&key, &"first", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!store
            .insert_if_absent(&key, &"second", Duration::from_secs(60))
            .await
            .unwrap());
        assert_eq!(store.get::<String>(&key).await.unwrap().as_deref(), Some("first"));
    }
}

#[tokio::test]
async fn test_health_check() {
    for store in backends().await {
        store.health_check().await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_memory_records_expire() {
    let store = Store::memory();
    store.set("short", &record(), Duration::from_secs(5)).await.unwrap();
    assert!(!store
        .insert_if_absent("short", &record(), Duration::from_secs(5))
        .await
        .unwrap());

    tokio::time::advance(Duration::from_secs(6)).await;

    assert_eq!(store.get::<Record>("short").await.unwrap(), None);
    assert_eq!(store.take::<Record>("short").await.unwrap(), None);
    assert_eq!(store.ttl("short").await.unwrap(), None);
    // An expired record no longer blocks a reservation
    assert!(store
        .insert_if_absent("short", &record(), Duration::from_secs(5))
        .await
        .unwrap());
}
