// ABOUTME: Persistence of the client's token pair
// ABOUTME: File-backed store with owner-only permissions plus an in-memory store for tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::api::ClientError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use teamsync_core::constants::tokens::CLIENT_EXPIRY_SKEW_SECS;
use teamsync_core::models::TokenResponse;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Persisted token pair; `expiresAt` is epoch milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokens {
    /// Access token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Access token expiry, epoch milliseconds
    pub expires_at: i64,
}

impl StoredTokens {
    /// Pair received at `received_at`
    #[must_use]
    pub fn from_response(response: &TokenResponse, received_at: DateTime<Utc>) -> Self {
        let lifetime = i64::try_from(response.expires_in).unwrap_or(i64::MAX / 1000);
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at: received_at
                .timestamp_millis()
                .saturating_add(lifetime.saturating_mul(1000)),
        }
    }

    /// Access token expiry
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.expires_at).single()
    }

    /// Whether the access token is expired, or will be within the clock skew allowance
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at()
            .is_none_or(|expires_at| now + Duration::seconds(CLIENT_EXPIRY_SKEW_SECS) >= expires_at)
    }
}

/// Where the client keeps its token pair
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Stored pair, if any
    async fn load(&self) -> Result<Option<StoredTokens>, ClientError>;

    /// Replace the stored pair
    async fn save(&self, tokens: &StoredTokens) -> Result<(), ClientError>;

    /// Remove the stored pair; succeeds when nothing is stored
    async fn clear(&self) -> Result<(), ClientError>;
}

/// JSON file readable only by its owner
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Store at an explicit path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `tokens.json` in the platform config directory, e.g. `~/.config/teamsync`
    #[must_use]
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("teamsync").join("tokens.json")))
    }

    /// Backing file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_error(action: &str, path: &Path, e: &std::io::Error) -> ClientError {
    ClientError::Storage(format!("failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn load(&self) -> Result<Option<StoredTokens>, ClientError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error("read", &self.path, &e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                // Treated as logged out; the next login overwrites it
                warn!(path = %self.path.display(), "Ignoring unreadable token file: {}", e);
                Ok(None)
            }
        }
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create", parent, &e))?;
        }

        let json = serde_json::to_vec_pretty(tokens)
            .map_err(|e| ClientError::Storage(format!("failed to encode tokens: {e}")))?;

        // Write then rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, &json)
            .await
            .map_err(|e| storage_error("write", &tmp, &e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error("replace", &self.path, &e))
    }

    async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &self.path, &e)),
        }
    }
}

/// Create `path` owner-only before any byte is written
///
/// A leftover file from an interrupted save is removed first, since the mode
/// only applies when the file is created.
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            return Err(e);
        }
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    tokens: Mutex<Option<StoredTokens>>,
}

impl MemorySecretStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with `tokens`
    #[must_use]
    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn load(&self) -> Result<Option<StoredTokens>, ClientError> {
        Ok(self.tokens.lock().await.clone())
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), ClientError> {
        *self.tokens.lock().await = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.tokens.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(expires_at: i64) -> StoredTokens {
        StoredTokens {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at,
        }
    }

    #[test]
    fn test_persisted_shape_uses_camel_case_millis() {
        let json = serde_json::to_value(sample(1_700_000_000_000)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "accessToken": "access",
                "refreshToken": "refresh",
                "expiresAt": 1_700_000_000_000_i64
            })
        );
    }

    #[test]
    fn test_expiry_includes_skew() {
        let now = Utc::now();
        let response = TokenResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            token_type: "Bearer".into(),
            expires_in: 900,
        };
        let tokens = StoredTokens::from_response(&response, now);
        assert!(!tokens.is_expired_at(now));
        assert!(tokens.is_expired_at(now + Duration::seconds(871)));
        assert!(!tokens.is_expired_at(now + Duration::seconds(869)));
    }

    #[tokio::test]
    async fn test_file_store_round_trip_and_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("nested").join("tokens.json"));

        assert_eq!(store.load().await.unwrap(), None);
        store.save(&sample(42)).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(sample(42)));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_temp_file_is_not_reused() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::new(dir.path().join("tokens.json"));

        // World-readable leftover from an interrupted save
        let tmp = dir.path().join("tokens.json.tmp");
        std::fs::write(&tmp, b"stale").unwrap();
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.save(&sample(7)).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!tmp.exists());
        assert_eq!(store.load().await.unwrap(), Some(sample(7)));
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert_eq!(FileSecretStore::new(path).load().await.unwrap(), None);
    }
}
