// ABOUTME: Wire types for the device flow and token endpoints plus the user record
// ABOUTME: Shared by the axum handlers and the reqwest-based client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Body of `POST /auth/device`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeRequest {
    /// Requesting client
    pub client_id: String,
}

/// Grant type value for device code exchange
pub const DEVICE_CODE_GRANT: &str = "device_code";

/// RFC 8628 spelling of the device code grant, accepted as an alias
pub const DEVICE_CODE_GRANT_URN: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Grant type value for refresh token exchange
pub const REFRESH_TOKEN_GRANT: &str = "refresh_token";

/// Body of `POST /auth/token`, one variant per `grant_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum TokenGrant {
    /// Exchange an approved device code
    #[serde(alias = "urn:ietf:params:oauth:grant-type:device_code")]
    DeviceCode {
        /// Code from `POST /auth/device`
        device_code: String,
    },
    /// Rotate a refresh token
    RefreshToken {
        /// Current refresh token
        refresh_token: String,
    },
}

/// Body of `POST /auth/refresh`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Current refresh token
    pub refresh_token: String,
}

/// Body of `POST /auth/revoke`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeRequest {
    /// Token to revoke
    pub token: String,
}

/// Body of `POST /auth/device/approve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequest {
    /// Code the user typed
    pub user_code: String,
}

/// Response of `POST /auth/device`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    /// Secret the client polls with
    pub device_code: String,
    /// Code the user types on the approval page
    pub user_code: String,
    /// Approval page URL
    pub verification_uri: String,
    /// Approval page URL with the user code pre-filled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Seconds until the device code expires
    pub expires_in: u64,
    /// Seconds the client must wait between polls
    pub interval: u64,
}

/// Successful response of `POST /auth/token` and `POST /auth/refresh`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed access token
    pub access_token: String,
    /// Signed refresh token
    pub refresh_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// OAuth-style error body: `{ "error": ..., "error_description": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthErrorBody {
    /// Machine-readable error code
    pub error: String,
    /// Human-readable explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// External identity providers supported for login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    /// Google OpenID Connect
    Google,
    /// GitHub OAuth apps
    Github,
}

impl OAuthProvider {
    /// Lowercase wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a provider name is not one of the supported providers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported OAuth provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for OAuthProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            other => Err(UnknownProvider(other.to_owned())),
        }
    }
}

/// How a local account was first created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountProvider {
    /// Google login
    Google,
    /// GitHub login
    Github,
    /// Email/password registration (managed elsewhere)
    Email,
}

impl AccountProvider {
    /// Lowercase storage name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
            Self::Email => "email",
        }
    }

    /// Parse the storage name, defaulting unknown values to `Email`
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "google" => Self::Google,
            "github" => Self::Github,
            _ => Self::Email,
        }
    }
}

impl From<OAuthProvider> for AccountProvider {
    fn from(provider: OAuthProvider) -> Self {
        match provider {
            OAuthProvider::Google => Self::Google,
            OAuthProvider::Github => Self::Github,
        }
    }
}

/// Local user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user id (UUID v4 for accounts created here)
    pub id: String,
    /// Lowercased, unique email address
    pub email: String,
    /// Display name
    pub name: String,
    /// Avatar URL
    pub avatar: Option<String>,
    /// Provider the account is linked to
    pub provider: AccountProvider,
    /// Account id at the provider
    pub provider_id: Option<String>,
    /// Whether the provider vouched for the email
    pub email_verified: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Last successful login
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a new account with a fresh id
    #[must_use]
    pub fn new(email: &str, name: impl Into<String>, provider: AccountProvider) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name: name.into(),
            avatar: None,
            provider,
            provider_id: None,
            email_verified: false,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }
}

/// Emails are stored trimmed and lowercased
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public projection of a [`User`] returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    /// User id
    pub id: String,
    /// Email address
    pub email: String,
    /// Display name
    pub name: String,
    /// Avatar URL
    pub avatar: Option<String>,
    /// Linked provider
    pub provider: AccountProvider,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            provider: user.provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_grant_wire_shape() {
        let grant = TokenGrant::DeviceCode {
            device_code: "abc".into(),
        };
        assert_eq!(
            serde_json::to_value(&grant).unwrap(),
            serde_json::json!({"grant_type": "device_code", "device_code": "abc"})
        );

        let parsed: TokenGrant = serde_json::from_str(
            r#"{"grant_type":"urn:ietf:params:oauth:grant-type:device_code","device_code":"abc"}"#,
        )
        .unwrap();
        assert_eq!(parsed, grant);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("github".parse::<OAuthProvider>(), Ok(OAuthProvider::Github));
        assert_eq!(
            "gitlab".parse::<OAuthProvider>(),
            Err(UnknownProvider("gitlab".into()))
        );
    }

    #[test]
    fn test_device_response_omits_missing_complete_uri() {
        let response = DeviceCodeResponse {
            device_code: "dc".into(),
            user_code: "ABCD-1234".into(),
            verification_uri: "http://localhost:3000/auth/device".into(),
            verification_uri_complete: None,
            expires_in: 600,
            interval: 5,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("verification_uri_complete").is_none());
    }

    #[test]
    fn test_new_user_lowercases_email() {
        let user = User::new("  Dev@Example.COM ", "Dev", AccountProvider::Github);
        assert_eq!(user.email, "dev@example.com");
    }
}
