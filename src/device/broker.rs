// ABOUTME: Device authorization state machine over the ephemeral code store
// ABOUTME: Issues codes, records approvals, and exchanges approved codes for tokens exactly once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::codes::{generate_device_code, generate_user_code, normalize_user_code};
use crate::auth::{TokenPair, TokenService};
use crate::config::DeviceFlowConfig;
use crate::errors::{AuthFlowError, AuthFlowResult};
use crate::store::{EphemeralStore, Store};
use crate::users::UserRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use teamsync_core::constants::device::{USER_CODE_MAX_ATTEMPTS, VSCODE_CLIENT_ID};
use teamsync_core::constants::keys;
use teamsync_core::errors::{AppError, AppResult};
use teamsync_core::models::{DeviceCodeResponse, User};
use tracing::{debug, info, warn};

/// Stored under `device_code:{device_code}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// Code shown to the user
    pub user_code: String,
    /// Requesting client
    pub client_id: String,
    /// When the code was issued
    pub created_at: DateTime<Utc>,
}

/// Stored under `device_approval:{user_code}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    /// Approving account
    pub user_id: String,
    /// When the approval was recorded
    pub approved_at: DateTime<Utc>,
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Approved; tokens minted for the approver. Returned at most once per device code.
    Issued {
        /// The new pair
        tokens: TokenPair,
        /// Approving account id
        user_id: String,
    },
    /// Not approved yet
    Pending,
    /// Expired, consumed, or unknown
    Expired,
    /// The approving account no longer exists
    Denied,
}

impl PollOutcome {
    /// Map non-issued outcomes to their wire error
    ///
    /// # Errors
    ///
    /// `AuthorizationPending`, `ExpiredToken`, or `AccessDenied`
    pub fn into_tokens(self) -> AuthFlowResult<TokenPair> {
        match self {
            Self::Issued { tokens, .. } => Ok(tokens),
            Self::Pending => Err(AuthFlowError::AuthorizationPending),
            Self::Expired => Err(AuthFlowError::ExpiredToken),
            Self::Denied => Err(AuthFlowError::AccessDenied),
        }
    }
}

/// Brokers the device authorization flow
///
/// Records per attempt:
/// - `device_code:{dc}` holds the [`PendingAuthorization`];
/// - `user_code:{uc}` points back to `dc` and reserves the user code;
/// - `device_approval:{uc}` holds the [`Approval`] once a user approves.
///
/// All three expire with the device code. Issuance is decided by atomically
/// taking `device_code:{dc}`: only the poll that removes it may mint tokens.
#[derive(Clone)]
pub struct DeviceAuthorizationBroker {
    store: Store,
    tokens: TokenService,
    users: Arc<dyn UserRepository>,
    config: DeviceFlowConfig,
}

impl DeviceAuthorizationBroker {
    /// Create a broker
    #[must_use]
    pub fn new(
        store: Store,
        tokens: TokenService,
        users: Arc<dyn UserRepository>,
        config: DeviceFlowConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            users,
            config,
        }
    }

    /// Start a device authorization for `client_id`
    ///
    /// # Errors
    ///
    /// `InvalidClient` for an unknown client; `Internal` if the store fails or
    /// no free user code could be reserved
    pub async fn request_code(&self, client_id: &str) -> AuthFlowResult<DeviceCodeResponse> {
        if client_id != VSCODE_CLIENT_ID {
            warn!(client_id = %client_id, "Device code requested by unknown client");
            return Err(AuthFlowError::InvalidClient);
        }

        let ttl = self.config.code_ttl;
        let device_code = generate_device_code();
        let user_code = self.reserve_user_code(&device_code, ttl).await?;

        let pending = PendingAuthorization {
            user_code: user_code.clone(),
            client_id: client_id.to_owned(),
            created_at: Utc::now(),
        };
        self.store.set(&device_key(&device_code), &pending, ttl).await?;

        let verification_uri = self.config.verification_uri();
        info!(user_code = %user_code, "Device code issued");

        Ok(DeviceCodeResponse {
            device_code,
            verification_uri_complete: Some(format!("{verification_uri}?user_code={user_code}")),
            user_code,
            verification_uri,
            expires_in: ttl.as_secs(),
            interval: self.config.poll_interval.as_secs(),
        })
    }

    /// Reserve a user code no live authorization holds
    async fn reserve_user_code(&self, device_code: &str, ttl: Duration) -> AppResult<String> {
        for _ in 0..USER_CODE_MAX_ATTEMPTS {
            let candidate = generate_user_code();
            if self
                .store
                .insert_if_absent(&user_code_key(&candidate), &device_code, ttl)
                .await?
            {
                return Ok(candidate);
            }
            debug!("User code collision, drawing another");
        }
        Err(AppError::internal(
            "Could not reserve a unique user code",
        ))
    }

    /// Record that `approver_user_id` approved `user_code`
    ///
    /// Re-approving a live code overwrites the approval. A consumed, expired, or
    /// unknown code is rejected without touching the store.
    ///
    /// # Errors
    ///
    /// `InvalidUserCode` if no live authorization has this user code
    pub async fn approve(&self, user_code: &str, approver_user_id: &str) -> AuthFlowResult<()> {
        let user_code = normalize_user_code(user_code).ok_or(AuthFlowError::InvalidUserCode)?;

        let device_code: String = self
            .store
            .get(&user_code_key(&user_code))
            .await?
            .ok_or(AuthFlowError::InvalidUserCode)?;

        // The index can outlive a device record consumed moments ago
        let remaining = self
            .store
            .ttl(&device_key(&device_code))
            .await?
            .ok_or(AuthFlowError::InvalidUserCode)?;

        let approval = Approval {
            user_id: approver_user_id.to_owned(),
            approved_at: Utc::now(),
        };
        self.store
            .set(&approval_key(&user_code), &approval, remaining)
            .await?;

        info!(user.id = %approver_user_id, user_code = %user_code, "Device authorization approved");
        Ok(())
    }

    /// Check a device code and, if approved, exchange it for tokens
    ///
    /// At most one call per device code returns [`PollOutcome::Issued`]; every
    /// later call returns [`PollOutcome::Expired`].
    ///
    /// # Errors
    ///
    /// Only infrastructure failures; protocol states are in [`PollOutcome`]
    pub async fn poll(&self, device_code: &str) -> AppResult<PollOutcome> {
        let device_key = device_key(device_code);

        let Some(pending) = self.store.get::<PendingAuthorization>(&device_key).await? else {
            return Ok(PollOutcome::Expired);
        };

        let approval_key = approval_key(&pending.user_code);
        if self.store.get::<Approval>(&approval_key).await?.is_none() {
            return Ok(PollOutcome::Pending);
        }

        // Single winner: a concurrent poll that loses this take sees nothing
        if self
            .store
            .take::<PendingAuthorization>(&device_key)
            .await?
            .is_none()
        {
            return Ok(PollOutcome::Expired);
        }

        let approval: Option<Approval> = self.store.take(&approval_key).await?;
        self.store.delete(&user_code_key(&pending.user_code)).await?;

        // The approval expired between the two reads; the device record went with it
        let Some(approval) = approval else {
            return Ok(PollOutcome::Expired);
        };

        let Some(user) = self.users.find_by_id(&approval.user_id).await? else {
            warn!(user.id = %approval.user_id, "Approving account no longer exists");
            return Ok(PollOutcome::Denied);
        };

        let tokens = self.tokens.issue(&user)?;
        self.record_login(&user).await;

        info!(user.id = %user.id, user_code = %pending.user_code, "Device authorization completed");
        Ok(PollOutcome::Issued {
            tokens,
            user_id: user.id,
        })
    }

    async fn record_login(&self, user: &User) {
        if let Err(e) = self.users.touch_last_login(&user.id, Utc::now()).await {
            warn!(user.id = %user.id, "Failed to record last login: {}", e);
        }
    }
}

fn device_key(device_code: &str) -> String {
    format!("{}{device_code}", keys::DEVICE_CODE)
}

fn user_code_key(user_code: &str) -> String {
    format!("{}{user_code}", keys::USER_CODE)
}

fn approval_key(user_code: &str) -> String {
    format!("{}{user_code}", keys::DEVICE_APPROVAL)
}
