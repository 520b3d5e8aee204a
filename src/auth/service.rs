// ABOUTME: Token lifecycle on top of the codec: issuance, rotation, and revocation
// ABOUTME: Enforces single-use refresh tokens and per-user revocation cutoffs via the code store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::codec::{AccessClaims, TokenCodec, TokenPair, TokenSubject};
use crate::errors::{AuthFlowError, AuthFlowResult};
use crate::store::{EphemeralStore, Store};
use crate::users::UserRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use teamsync_core::constants::keys;
use teamsync_core::errors::AppResult;
use teamsync_core::models::User;
use tracing::{info, warn};

/// Issues, rotates, and revokes token pairs
///
/// Revocation policy: refresh tokens are tracked (single use, plus a per-user
/// cutoff written by [`Self::revoke_all`]). Access tokens are not looked up on
/// each request; a revoked session keeps working until its access token
/// expires, at most the configured access lifetime.
#[derive(Clone)]
pub struct TokenService {
    codec: Arc<TokenCodec>,
    store: Store,
    users: Arc<dyn UserRepository>,
}

impl TokenService {
    /// Create a service over shared dependencies
    #[must_use]
    pub fn new(codec: Arc<TokenCodec>, store: Store, users: Arc<dyn UserRepository>) -> Self {
        Self {
            codec,
            store,
            users,
        }
    }

    /// The underlying codec
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Mint a fresh pair for `user`
    ///
    /// # Errors
    ///
    /// Returns an error only on signing misconfiguration
    pub fn issue(&self, user: &User) -> AppResult<TokenPair> {
        self.codec.mint(TokenSubject::from(user))
    }

    /// Verify an access token
    ///
    /// # Errors
    ///
    /// `InvalidToken` or `TokenExpired`
    pub fn verify_access(&self, token: &str) -> AuthFlowResult<AccessClaims> {
        self.codec.verify_access(token)
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The presented token is spent even when the user lookup that follows
    /// fails, so a refresh token can never be replayed.
    ///
    /// # Errors
    ///
    /// `InvalidRefreshToken` if the token is invalid, expired, already used, or
    /// issued before a revoke-all; `UnknownUser` if its subject no longer exists
    pub async fn refresh(&self, refresh_token: &str) -> AuthFlowResult<(TokenPair, User)> {
        let now = Utc::now();
        let claims = self.codec.verify_refresh_at(refresh_token, now)?;

        if self.revoked_by_cutoff(&claims.sub, claims.iat_ms).await? {
            info!(user.id = %claims.sub, "Refresh token issued before revoke-all rejected");
            return Err(AuthFlowError::InvalidRefreshToken);
        }

        let first_use = self
            .store
            .insert_if_absent(
                &used_key(&claims.jti),
                &now.timestamp(),
                claims.remaining_at(now).max(Duration::from_secs(1)),
            )
            .await?;
        if !first_use {
            warn!(user.id = %claims.sub, "Refresh token reuse rejected");
            return Err(AuthFlowError::InvalidRefreshToken);
        }

        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthFlowError::UnknownUser)?;

        let pair = self.issue(&user)?;
        info!(user.id = %user.id, "Token pair rotated");
        Ok((pair, user))
    }

    /// Revoke a single refresh token owned by `caller_id`
    ///
    /// Access tokens, tokens owned by someone else, and unverifiable tokens are
    /// accepted and ignored so the endpoint never reveals token validity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn revoke(&self, token: &str, caller_id: &str) -> AppResult<()> {
        let now = Utc::now();
        let Ok(claims) = self.codec.verify_refresh_at(token, now) else {
            tracing::debug!(user.id = %caller_id, "Revoke called with a non-refresh token");
            return Ok(());
        };
        if claims.sub != caller_id {
            warn!(user.id = %caller_id, "Revoke called with another user's token");
            return Ok(());
        }

        self.store
            .set(
                &used_key(&claims.jti),
                &now.timestamp(),
                claims.remaining_at(now).max(Duration::from_secs(1)),
            )
            .await?;
        info!(user.id = %caller_id, "Refresh token revoked");
        Ok(())
    }

    /// Revoke every refresh token issued to `user_id` up to now
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn revoke_all(&self, user_id: &str) -> AppResult<()> {
        self.revoke_all_at(user_id, Utc::now()).await
    }

    /// Revoke every refresh token issued to `user_id` up to `now`
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub async fn revoke_all_at(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<()> {
        // Outlives every refresh token it could match
        self.store
            .set(
                &format!("{}{user_id}", keys::REVOKED_BEFORE),
                &now.timestamp_millis(),
                self.codec.refresh_ttl(),
            )
            .await?;
        info!(user.id = %user_id, "All refresh tokens revoked");
        Ok(())
    }

    async fn revoked_by_cutoff(&self, user_id: &str, issued_at_ms: i64) -> AppResult<bool> {
        let cutoff: Option<i64> = self
            .store
            .get(&format!("{}{user_id}", keys::REVOKED_BEFORE))
            .await?;
        // A token minted in the same millisecond as the cutoff is revoked too
        Ok(cutoff.is_some_and(|cutoff| issued_at_ms <= cutoff))
    }
}

fn used_key(jti: &str) -> String {
    format!("{}{jti}", keys::REFRESH_USED)
}
