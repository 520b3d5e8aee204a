// ABOUTME: Wire shapes returned by Google and GitHub and their normalization
// ABOUTME: Maps each provider's profile JSON onto UserIdentity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::UserIdentity;
use serde::Deserialize;
use teamsync_core::models::OAuthProvider;

/// Token endpoint success body, common to both providers
#[derive(Debug, Deserialize)]
pub struct ProviderTokenResponse {
    /// Provider access token
    pub access_token: Option<String>,
    /// GitHub answers 200 with an `error` field on a bad code
    pub error: Option<String>,
    /// Description accompanying `error`
    pub error_description: Option<String>,
}

/// Google `userinfo` response
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    /// v2 endpoints send `id`, OpenID Connect sends `sub`
    #[serde(alias = "sub")]
    pub id: String,
    /// Email address
    pub email: Option<String>,
    /// v2 spelling
    pub verified_email: Option<bool>,
    /// OpenID Connect spelling
    pub email_verified: Option<bool>,
    /// Full name
    pub name: Option<String>,
    /// Avatar URL
    pub picture: Option<String>,
}

impl GoogleProfile {
    /// Normalize, or `None` when Google withheld the email
    #[must_use]
    pub fn into_identity(self) -> Option<UserIdentity> {
        let email = self.email.filter(|e| !e.is_empty())?;
        Some(UserIdentity {
            provider: OAuthProvider::Google,
            provider_id: self.id,
            name: self.name.filter(|n| !n.is_empty()).unwrap_or_else(|| email.clone()),
            email,
            avatar: self.picture,
            email_verified: self.verified_email.or(self.email_verified).unwrap_or(false),
        })
    }
}

/// GitHub `/user` response
#[derive(Debug, Deserialize)]
pub struct GithubProfile {
    /// Numeric account id
    pub id: u64,
    /// Username
    pub login: String,
    /// Display name, often unset
    pub name: Option<String>,
    /// Public email, unset when the user hides it
    pub email: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
}

/// One entry of GitHub `/user/emails`
#[derive(Debug, Clone, Deserialize)]
pub struct GithubEmail {
    /// Address
    pub email: String,
    /// Primary address flag
    pub primary: bool,
    /// Verified flag
    pub verified: bool,
}

/// The primary verified address, else any verified one
#[must_use]
pub fn select_github_email(emails: &[GithubEmail]) -> Option<&GithubEmail> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.verified))
}

impl GithubProfile {
    /// Public email, if GitHub returned one
    #[must_use]
    pub fn public_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    /// Normalize with the resolved email
    #[must_use]
    pub fn into_identity(self, email: String, email_verified: bool) -> UserIdentity {
        UserIdentity {
            provider: OAuthProvider::Github,
            provider_id: self.id.to_string(),
            name: self.name.filter(|n| !n.is_empty()).unwrap_or(self.login),
            email,
            avatar: self.avatar_url,
            email_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_profile_accepts_oidc_shape() {
        let profile: GoogleProfile = serde_json::from_str(
            r#"{"sub":"1089","email":"a@teamsync.dev","email_verified":true,"name":"Ann","picture":"https://p/a.png"}"#,
        )
        .unwrap();
        let identity = profile.into_identity().unwrap();
        assert_eq!(identity.provider_id, "1089");
        assert!(identity.email_verified);
        assert_eq!(identity.avatar.as_deref(), Some("https://p/a.png"));
    }

    #[test]
    fn test_google_profile_without_email_is_rejected() {
        let profile: GoogleProfile = serde_json::from_str(r#"{"id":"1"}"#).unwrap();
        assert!(profile.into_identity().is_none());
    }

    #[test]
    fn test_github_name_falls_back_to_login() {
        let profile: GithubProfile =
            serde_json::from_str(r#"{"id":42,"login":"octo","name":null,"email":null}"#).unwrap();
        let identity = profile.into_identity("octo@teamsync.dev".into(), true);
        assert_eq!(identity.name, "octo");
        assert_eq!(identity.provider_id, "42");
    }

    #[test]
    fn test_select_github_email_prefers_primary_verified() {
        let emails = vec![
            GithubEmail { email: "old@x.dev".into(), primary: false, verified: true },
            GithubEmail { email: "main@x.dev".into(), primary: true, verified: true },
            GithubEmail { email: "new@x.dev".into(), primary: false, verified: false },
        ];
        assert_eq!(select_github_email(&emails).map(|e| e.email.as_str()), Some("main@x.dev"));
        assert!(select_github_email(&emails[2..]).is_none());
    }
}
