// ABOUTME: Stateless JWT codec minting and verifying access and refresh tokens
// ABOUTME: HS256 with separate signing keys per token type and explicit expiry checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use crate::config::AuthConfig;
use crate::errors::{AuthFlowError, AuthFlowResult};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use teamsync_core::constants::tokens::BEARER;
use teamsync_core::errors::{AppError, AppResult};
use teamsync_core::models::TokenResponse;
use uuid::Uuid;

/// Discriminates the two token kinds inside the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived API credential
    Access,
    /// Long-lived credential exchanged for a new pair
    Refresh,
}

/// Access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    /// User email
    pub email: String,
    /// User display name
    pub name: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
    /// Always [`TokenKind::Access`]
    pub token_type: TokenKind,
    /// Unique token id
    pub jti: String,
}

/// Refresh token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User id
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Issued at (unix milliseconds), compared against revoke-all cutoffs
    pub iat_ms: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
    /// Always [`TokenKind::Refresh`]
    pub token_type: TokenKind,
    /// Unique token id, spent on first refresh
    pub jti: String,
}

impl RefreshClaims {
    /// Time left before the token expires at `now`, zero when already expired
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        let secs = self.exp.saturating_sub(now.timestamp());
        std::time::Duration::from_secs(u64::try_from(secs).unwrap_or(0))
    }
}

/// Identity a token pair is bound to
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    /// User id
    pub user_id: &'a str,
    /// User email
    pub email: &'a str,
    /// User display name
    pub name: &'a str,
}

impl<'a> From<&'a teamsync_core::models::User> for TokenSubject<'a> {
    fn from(user: &'a teamsync_core::models::User) -> Self {
        Self {
            user_id: &user.id,
            email: &user.email,
            name: &user.name,
        }
    }
}

/// Access and refresh token issued together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Signed access token
    pub access_token: String,
    /// Signed refresh token
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// When the access token expires
    pub access_expires_at: DateTime<Utc>,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: BEARER.to_owned(),
            expires_in: pair.expires_in,
        }
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Mints and verifies signed tokens
///
/// Pure apart from the clock: every operation has an `_at` variant taking the
/// current time explicitly. Access and refresh tokens are signed with different
/// secrets, so neither verifies as the other.
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    /// Build a codec from signing configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a secret is empty, both secrets are equal,
    /// or a lifetime does not fit a chrono duration
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(AppError::config("JWT signing secrets cannot be empty"));
        }
        if config.access_secret == config.refresh_secret {
            return Err(AppError::config(
                "Access and refresh tokens must use different signing secrets",
            ));
        }
        let access_ttl = Duration::from_std(config.access_ttl)
            .map_err(|e| AppError::config(format!("Invalid access token lifetime: {e}")))?;
        let refresh_ttl = Duration::from_std(config.refresh_ttl)
            .map_err(|e| AppError::config(format!("Invalid refresh token lifetime: {e}")))?;

        Ok(Self {
            access: SigningKeys::from_secret(&config.access_secret),
            refresh: SigningKeys::from_secret(&config.refresh_secret),
            access_ttl,
            refresh_ttl,
        })
    }

    /// Refresh token lifetime
    #[must_use]
    pub fn refresh_ttl(&self) -> std::time::Duration {
        self.refresh_ttl.to_std().unwrap_or_default()
    }

    /// Mint a pair for `subject` at the current time
    ///
    /// # Errors
    ///
    /// Returns an error only if encoding fails, which indicates misconfiguration
    pub fn mint(&self, subject: TokenSubject<'_>) -> AppResult<TokenPair> {
        self.mint_at(subject, Utc::now())
    }

    /// Mint a pair for `subject` as of `now`
    ///
    /// # Errors
    ///
    /// Returns an error only if encoding fails, which indicates misconfiguration
    pub fn mint_at(&self, subject: TokenSubject<'_>, now: DateTime<Utc>) -> AppResult<TokenPair> {
        let access_expires_at = now + self.access_ttl;
        let access_claims = AccessClaims {
            sub: subject.user_id.to_owned(),
            email: subject.email.to_owned(),
            name: subject.name.to_owned(),
            iat: now.timestamp(),
            exp: access_expires_at.timestamp(),
            token_type: TokenKind::Access,
            jti: Uuid::new_v4().to_string(),
        };
        let refresh_claims = RefreshClaims {
            sub: subject.user_id.to_owned(),
            iat: now.timestamp(),
            iat_ms: now.timestamp_millis(),
            exp: (now + self.refresh_ttl).timestamp(),
            token_type: TokenKind::Refresh,
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let access_token = encode(&header, &access_claims, &self.access.encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign access token: {e}")))?;
        let refresh_token = encode(&header, &refresh_claims, &self.refresh.encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign refresh token: {e}")))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: u64::try_from(self.access_ttl.num_seconds()).unwrap_or(0),
            access_expires_at,
        })
    }

    /// Verify an access token at the current time
    ///
    /// # Errors
    ///
    /// `InvalidToken` for a bad signature, structure, or token type;
    /// `TokenExpired` when the token is past its expiry
    pub fn verify_access(&self, token: &str) -> AuthFlowResult<AccessClaims> {
        self.verify_access_at(token, Utc::now())
    }

    /// Verify an access token as of `now`
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify_access`]
    pub fn verify_access_at(&self, token: &str, now: DateTime<Utc>) -> AuthFlowResult<AccessClaims> {
        let claims: AccessClaims =
            decode_unchecked_expiry(token, &self.access.decoding).ok_or(AuthFlowError::InvalidToken)?;
        if claims.token_type != TokenKind::Access {
            return Err(AuthFlowError::InvalidToken);
        }
        if now.timestamp() >= claims.exp {
            tracing::debug!(user.id = %claims.sub, "Access token expired");
            return Err(AuthFlowError::TokenExpired);
        }
        Ok(claims)
    }

    /// Verify a refresh token at the current time
    ///
    /// # Errors
    ///
    /// `InvalidRefreshToken` for a bad signature, wrong type, or expiry
    pub fn verify_refresh(&self, token: &str) -> AuthFlowResult<RefreshClaims> {
        self.verify_refresh_at(token, Utc::now())
    }

    /// Verify a refresh token as of `now`
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify_refresh`]
    pub fn verify_refresh_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthFlowResult<RefreshClaims> {
        let claims: RefreshClaims = decode_unchecked_expiry(token, &self.refresh.decoding)
            .ok_or(AuthFlowError::InvalidRefreshToken)?;
        if claims.token_type != TokenKind::Refresh || now.timestamp() >= claims.exp {
            return Err(AuthFlowError::InvalidRefreshToken);
        }
        Ok(claims)
    }
}

/// Check signature and structure; expiry is compared by the caller so that it
/// can be told apart from a bad signature
fn decode_unchecked_expiry<T: serde::de::DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
) -> Option<T> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    match decode::<T>(token, key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::warn!("JWT validation failed: {:?}", e.kind());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(&AuthConfig::new("access-secret", "refresh-secret")).unwrap()
    }

    fn subject() -> TokenSubject<'static> {
        TokenSubject {
            user_id: "user-1",
            email: "dev@teamsync.dev",
            name: "Dev",
        }
    }

    #[test]
    fn test_rejects_shared_secret() {
        assert!(TokenCodec::new(&AuthConfig::new("same", "same")).is_err());
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let codec = codec();
        let pair = codec.mint(subject()).unwrap();
        assert!(matches!(
            codec.verify_access(&pair.refresh_token),
            Err(AuthFlowError::InvalidToken)
        ));
        assert!(matches!(
            codec.verify_refresh(&pair.access_token),
            Err(AuthFlowError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let issued = Utc::now();
        let pair = codec.mint_at(subject(), issued).unwrap();

        let just_before = issued + Duration::seconds(899);
        assert!(codec.verify_access_at(&pair.access_token, just_before).is_ok());

        let at_expiry = issued + Duration::seconds(900);
        assert!(matches!(
            codec.verify_access_at(&pair.access_token, at_expiry),
            Err(AuthFlowError::TokenExpired)
        ));
    }

    #[test]
    fn test_remaining_at_saturates() {
        let codec = codec();
        let issued = Utc::now();
        let pair = codec.mint_at(subject(), issued).unwrap();
        let claims = codec.verify_refresh_at(&pair.refresh_token, issued).unwrap();

        assert_eq!(claims.remaining_at(issued).as_secs(), 7 * 24 * 60 * 60);
        assert_eq!(
            claims.remaining_at(issued + Duration::days(30)),
            std::time::Duration::ZERO
        );
    }
}
