// ABOUTME: Client-side device flow and token upkeep
// ABOUTME: Cancellable poll loop, serialized refresh of single-use refresh tokens, and logout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::api::{AuthApi, PollOutcome};
use super::prompt::VerificationPrompt;
use super::store::{SecretStore, StoredTokens};
use chrono::Utc;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use teamsync_core::constants::device::{SLOW_DOWN_INCREMENT_SECS, VSCODE_CLIENT_ID};
use teamsync_core::constants::service::DEFAULT_MAX_POLL_ATTEMPTS;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Client session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Client id sent to `/auth/device`
    pub client_id: String,
    /// Polls before giving up, independent of the code's expiry
    pub max_poll_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: VSCODE_CLIENT_ID.to_owned(),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `TEAMSYNC_CLIENT_ID` and `TEAMSYNC_MAX_POLL_ATTEMPTS`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_id: env::var("TEAMSYNC_CLIENT_ID").unwrap_or(defaults.client_id),
            max_poll_attempts: env::var("TEAMSYNC_MAX_POLL_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.max_poll_attempts),
        }
    }
}

/// Why a login ended without tokens
#[derive(Debug)]
enum LoginFailure {
    Cancelled,
    Expired,
    Denied,
    TimedOut,
    Failed(String),
}

impl LoginFailure {
    fn message(&self) -> String {
        match self {
            Self::Cancelled => "sign-in was cancelled".into(),
            Self::Expired => "the code expired before it was approved".into(),
            Self::Denied => "authorization was denied".into(),
            Self::TimedOut => "gave up waiting for approval".into(),
            Self::Failed(message) => message.clone(),
        }
    }
}

/// Signed-in state of one client installation
pub struct AuthSession {
    api: AuthApi,
    store: Arc<dyn SecretStore>,
    prompt: Arc<dyn VerificationPrompt>,
    config: SessionConfig,
    refresh_lock: Mutex<()>,
    shutdown: CancellationToken,
}

impl AuthSession {
    /// Create a session
    #[must_use]
    pub fn new(
        api: AuthApi,
        store: Arc<dyn SecretStore>,
        prompt: Arc<dyn VerificationPrompt>,
        config: SessionConfig,
    ) -> Self {
        Self {
            api,
            store,
            prompt,
            config,
            refresh_lock: Mutex::new(()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops an in-flight [`AuthSession::login`]
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the device flow and persist the issued tokens
    ///
    /// Returns `true` once tokens are stored. Expiry, denial, cancellation, the
    /// attempt ceiling, and non-transient errors return `false` after telling
    /// the prompt why.
    pub async fn login(&self) -> bool {
        match self.device_flow().await {
            Ok(()) => {
                info!("Device login completed");
                self.prompt.on_success();
                true
            }
            Err(failure) => {
                info!(reason = ?failure, "Device login did not complete");
                self.prompt.on_failure(&failure.message());
                false
            }
        }
    }

    async fn device_flow(&self) -> Result<(), LoginFailure> {
        // Each select polls cancellation first so a shutdown is never lost to a ready timer
        let code = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => return Err(LoginFailure::Cancelled),
            result = self.api.request_device_code(&self.config.client_id) => {
                result.map_err(|e| LoginFailure::Failed(e.to_string()))?
            }
        };

        self.prompt.show_code(
            &code.user_code,
            &code.verification_uri,
            code.verification_uri_complete.as_deref(),
        );

        let mut interval = Duration::from_secs(code.interval);
        for attempt in 1..=self.config.max_poll_attempts {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(LoginFailure::Cancelled),
                () = tokio::time::sleep(interval) => {}
            }

            let outcome = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(LoginFailure::Cancelled),
                outcome = self.api.poll_token(&code.device_code) => outcome,
            };

            match outcome {
                Ok(PollOutcome::Issued(response)) => {
                    let tokens = StoredTokens::from_response(&response, Utc::now());
                    return self
                        .store
                        .save(&tokens)
                        .await
                        .map_err(|e| LoginFailure::Failed(e.to_string()));
                }
                Ok(PollOutcome::Pending) => debug!(attempt, "Authorization pending"),
                Ok(PollOutcome::SlowDown) => {
                    interval += Duration::from_secs(SLOW_DOWN_INCREMENT_SECS);
                    debug!(attempt, interval_secs = interval.as_secs(), "Server asked to slow down");
                }
                Ok(PollOutcome::Expired) => return Err(LoginFailure::Expired),
                Ok(PollOutcome::Denied) => return Err(LoginFailure::Denied),
                Err(e) if e.is_transient() => {
                    warn!(attempt, "Poll failed, retrying: {}", e);
                }
                Err(e) => return Err(LoginFailure::Failed(e.to_string())),
            }
        }

        Err(LoginFailure::TimedOut)
    }

    /// Whether a usable access token exists, refreshing once if it expired
    pub async fn is_authenticated(&self) -> bool {
        self.get_access_token().await.is_some()
    }

    /// Current access token, refreshed first when it is expired or about to be
    ///
    /// A rejected refresh clears the stored pair, so the next call asks for a
    /// new login. A network failure keeps it for a later retry.
    pub async fn get_access_token(&self) -> Option<String> {
        let tokens = self.load().await?;
        if !tokens.is_expired_at(Utc::now()) {
            return Some(tokens.access_token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while this one waited
        let tokens = self.load().await?;
        if !tokens.is_expired_at(Utc::now()) {
            return Some(tokens.access_token);
        }

        match self.api.refresh(&tokens.refresh_token).await {
            Ok(response) => {
                let fresh = StoredTokens::from_response(&response, Utc::now());
                if let Err(e) = self.store.save(&fresh).await {
                    warn!("Failed to persist refreshed tokens: {}", e);
                }
                debug!("Access token refreshed");
                Some(fresh.access_token)
            }
            Err(e) if e.is_rejection() => {
                warn!("Refresh token rejected, signing out: {}", e);
                if let Err(e) = self.store.clear().await {
                    warn!("Failed to clear rejected tokens: {}", e);
                }
                None
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                None
            }
        }
    }

    /// Revoke the refresh token if the server is reachable, then forget both tokens
    ///
    /// The revoke endpoint needs a live access token, so an expired one is
    /// refreshed first and the rotated refresh token is the one revoked.
    pub async fn logout(&self) {
        if self.load().await.is_some() {
            match self.get_access_token().await {
                Some(access_token) => self.revoke_current(&access_token).await,
                None => info!("No usable access token, skipping server-side revoke"),
            }
        }

        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear stored tokens: {}", e);
        }
    }

    async fn revoke_current(&self, access_token: &str) {
        let Some(tokens) = self.load().await else {
            return;
        };
        if let Err(e) = self.api.revoke(access_token, &tokens.refresh_token).await {
            warn!("Server-side revoke failed, clearing local tokens anyway: {}", e);
        }
    }

    async fn load(&self) -> Option<StoredTokens> {
        match self.store.load().await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Failed to read stored tokens: {}", e);
                None
            }
        }
    }
}
