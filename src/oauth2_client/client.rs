// ABOUTME: Identity bridge turning provider authorization codes into user identities
// ABOUTME: Authorization URL construction, code exchange, and profile fetch for Google and GitHub
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::providers::{
    select_github_email, GithubEmail, GithubProfile, GoogleProfile, ProviderTokenResponse,
};
use super::UserIdentity;
use crate::config::{OAuthConfig, OAuthProviderConfig};
use crate::errors::{AuthFlowError, AuthFlowResult};
use crate::utils::http_client::oauth_client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use teamsync_core::constants::service::SERVICE_NAME;
use teamsync_core::models::OAuthProvider;
use tracing::{debug, warn};
use url::Url;

/// OAuth client for the login providers
#[derive(Clone)]
pub struct IdentityBridge {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl IdentityBridge {
    /// Create a bridge with the shared OAuth HTTP client
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_client(config, oauth_client())
    }

    /// Create a bridge with a caller-supplied HTTP client
    #[must_use]
    pub const fn with_client(config: OAuthConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Resolve a provider name to its configuration
    ///
    /// # Errors
    ///
    /// `UnsupportedProvider` if the name is not `google` or `github`, or the
    /// provider has no credentials configured
    pub fn provider(&self, name: &str) -> AuthFlowResult<(OAuthProvider, &OAuthProviderConfig)> {
        let provider: OAuthProvider = name
            .parse()
            .map_err(|_| AuthFlowError::UnsupportedProvider(name.to_owned()))?;
        let config = match provider {
            OAuthProvider::Google => self.config.google.as_ref(),
            OAuthProvider::Github => self.config.github.as_ref(),
        };
        config
            .map(|c| (provider, c))
            .ok_or_else(|| AuthFlowError::UnsupportedProvider(name.to_owned()))
    }

    /// Build the provider's authorization URL
    ///
    /// `redirect_uri` falls back to the configured default; `state` is passed
    /// through untouched when present.
    ///
    /// # Errors
    ///
    /// `UnsupportedProvider` for an unknown or unconfigured provider;
    /// `Internal` if the configured endpoint is not a URL
    pub fn authorization_url(
        &self,
        provider: &str,
        redirect_uri: Option<&str>,
        state: Option<&str>,
    ) -> AuthFlowResult<String> {
        let (provider, config) = self.provider(provider)?;
        let mut url = Url::parse(&config.auth_url).map_err(|e| {
            teamsync_core::errors::AppError::config(format!(
                "Invalid {provider} authorization URL: {e}"
            ))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &config.client_id)
                .append_pair("redirect_uri", self.redirect_uri(redirect_uri))
                .append_pair("response_type", "code")
                .append_pair("scope", &config.scopes.join(" "));
            if let Some(state) = state {
                query.append_pair("state", state);
            }
            if provider == OAuthProvider::Google {
                query
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
        }

        Ok(url.into())
    }

    /// Exchange an authorization code for the caller's identity
    ///
    /// One attempt only: the code is spent by the provider on first use.
    ///
    /// # Errors
    ///
    /// `UnsupportedProvider` for an unknown or unconfigured provider;
    /// `ProviderError` if the token exchange or profile fetch fails
    pub async fn exchange_code_for_user(
        &self,
        provider: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> AuthFlowResult<UserIdentity> {
        let (provider, config) = self.provider(provider)?;
        let access_token = self
            .exchange_code(provider, config, code, self.redirect_uri(redirect_uri))
            .await?;

        match provider {
            OAuthProvider::Google => {
                let profile: GoogleProfile =
                    self.get_json(provider, &config.profile_url, &access_token).await?;
                profile.into_identity().ok_or_else(|| {
                    AuthFlowError::ProviderError("Google profile has no email address".into())
                })
            }
            OAuthProvider::Github => {
                let profile: GithubProfile =
                    self.get_json(provider, &config.profile_url, &access_token).await?;
                if let Some(email) = profile.public_email() {
                    let email = email.to_owned();
                    return Ok(profile.into_identity(email, false));
                }
                let emails_url = config.emails_url.as_deref().ok_or_else(|| {
                    AuthFlowError::ProviderError("GitHub profile has no public email".into())
                })?;
                let emails: Vec<GithubEmail> =
                    self.get_json(provider, emails_url, &access_token).await?;
                let chosen = select_github_email(&emails).cloned().ok_or_else(|| {
                    AuthFlowError::ProviderError("GitHub account has no verified email".into())
                })?;
                Ok(profile.into_identity(chosen.email, chosen.verified))
            }
        }
    }

    fn redirect_uri<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|uri| !uri.is_empty())
            .unwrap_or(self.config.default_redirect_uri.as_str())
    }

    async fn exchange_code(
        &self,
        provider: OAuthProvider,
        config: &OAuthProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> AuthFlowResult<String> {
        let params = [
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .client
            .post(&config.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| provider_error(provider, "token request failed", &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(oauth.provider = %provider, status = %status, "Token exchange rejected");
            return Err(AuthFlowError::ProviderError(format!(
                "{provider} token exchange returned {status}"
            )));
        }

        let body: ProviderTokenResponse = response
            .json()
            .await
            .map_err(|e| provider_error(provider, "token response unreadable", &e))?;

        if let Some(error) = body.error {
            warn!(oauth.provider = %provider, error = %error, "Token exchange rejected");
            return Err(AuthFlowError::ProviderError(format!(
                "{provider} token exchange failed: {}",
                body.error_description.unwrap_or(error)
            )));
        }

        debug!(oauth.provider = %provider, "Authorization code exchanged");
        body.access_token.ok_or_else(|| {
            AuthFlowError::ProviderError(format!("{provider} returned no access token"))
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        provider: OAuthProvider,
        url: &str,
        access_token: &str,
    ) -> AuthFlowResult<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, SERVICE_NAME)
            .send()
            .await
            .map_err(|e| provider_error(provider, "profile request failed", &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(oauth.provider = %provider, status = %status, "Profile fetch rejected");
            return Err(AuthFlowError::ProviderError(format!(
                "{provider} profile request returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| provider_error(provider, "profile response unreadable", &e))
    }
}

fn provider_error(provider: OAuthProvider, what: &str, error: &reqwest::Error) -> AuthFlowError {
    warn!(oauth.provider = %provider, "{}: {}", what, error);
    AuthFlowError::ProviderError(format!("{provider} {what}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> IdentityBridge {
        IdentityBridge::new(OAuthConfig {
            google: Some(OAuthProviderConfig::google("g-client", "g-secret")),
            github: None,
            default_redirect_uri: "http://localhost:3000/auth/callback".into(),
        })
    }

    #[test]
    fn test_google_authorization_url() {
        let url = bridge()
            .authorization_url("google", None, Some("xyz"))
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(pairs.contains(&("client_id".into(), "g-client".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://localhost:3000/auth/callback".into()
        )));
        assert!(pairs.contains(&("scope".into(), "openid email profile".into())));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(pairs.contains(&("prompt".into(), "consent".into())));
    }

    #[test]
    fn test_state_omitted_when_absent() {
        let url = bridge()
            .authorization_url("google", Some("http://app/cb"), None)
            .unwrap();
        assert!(!url.contains("state="));
        assert!(url.contains("redirect_uri=http%3A%2F%2Fapp%2Fcb"));
    }

    #[test]
    fn test_unknown_and_unconfigured_providers_rejected() {
        let bridge = bridge();
        assert!(matches!(
            bridge.authorization_url("facebook", None, None),
            Err(AuthFlowError::UnsupportedProvider(p)) if p == "facebook"
        ));
        assert!(matches!(
            bridge.authorization_url("github", None, None),
            Err(AuthFlowError::UnsupportedProvider(_))
        ));
    }
}
