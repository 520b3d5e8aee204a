// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses signing secrets, lifetimes, store/database URLs, and OAuth providers from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! Environment-based configuration management for production deployment

use crate::store::StoreConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;
use teamsync_core::constants::{device, service, tokens};
use tracing::{info, warn};

/// Environment type for security and other configurations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Deployed service
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Token signing configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 secret for access tokens
    pub access_secret: String,
    /// HS256 secret for refresh tokens, must differ from `access_secret`
    pub refresh_secret: String,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    /// Build a config with default lifetimes
    #[must_use]
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::from_secs(tokens::DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_ttl: Duration::from_secs(tokens::DEFAULT_REFRESH_TOKEN_TTL_SECS),
        }
    }
}

// Secrets never reach logs
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Device authorization flow settings
#[derive(Debug, Clone)]
pub struct DeviceFlowConfig {
    /// Lifetime of a device-code record
    pub code_ttl: Duration,
    /// Poll interval handed to clients
    pub poll_interval: Duration,
    /// Base URL of the web console hosting the approval page
    pub frontend_url: String,
}

impl DeviceFlowConfig {
    /// Defaults with the given console URL
    #[must_use]
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            code_ttl: Duration::from_secs(device::DEFAULT_DEVICE_CODE_TTL_SECS),
            poll_interval: Duration::from_secs(device::DEFAULT_POLL_INTERVAL_SECS),
            frontend_url: frontend_url.into(),
        }
    }

    /// `{frontend}/auth/device`
    #[must_use]
    pub fn verification_uri(&self) -> String {
        format!(
            "{}{}",
            self.frontend_url.trim_end_matches('/'),
            device::VERIFICATION_PATH
        )
    }
}

/// Credentials and endpoints for one OAuth provider
#[derive(Clone)]
pub struct OAuthProviderConfig {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Profile endpoint
    pub profile_url: String,
    /// Email listing endpoint (GitHub only)
    pub emails_url: Option<String>,
    /// Requested scopes
    pub scopes: Vec<String>,
}

impl OAuthProviderConfig {
    /// Google endpoints with the given credentials
    #[must_use]
    pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            profile_url: "https://www.googleapis.com/oauth2/v2/userinfo".into(),
            emails_url: None,
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
        }
    }

    /// GitHub endpoints with the given credentials
    #[must_use]
    pub fn github(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://github.com/login/oauth/authorize".into(),
            token_url: "https://github.com/login/oauth/access_token".into(),
            profile_url: "https://api.github.com/user".into(),
            emails_url: Some("https://api.github.com/user/emails".into()),
            scopes: vec!["user:email".into()],
        }
    }
}

impl fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

/// OAuth login configuration
#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    /// Google, when credentials are configured
    pub google: Option<OAuthProviderConfig>,
    /// GitHub, when credentials are configured
    pub github: Option<OAuthProviderConfig>,
    /// Redirect URI used when the caller does not supply one
    pub default_redirect_uri: String,
}

/// Per-IP rate limit for the unauthenticated auth endpoints
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Token signing
    pub auth: AuthConfig,
    /// Device flow
    pub device: DeviceFlowConfig,
    /// Ephemeral code store
    pub store: StoreConfig,
    /// User database URL
    pub database_url: String,
    /// OAuth providers
    pub oauth: OAuthConfig,
    /// Allowed CORS origins
    pub cors_allowed_origins: Vec<String>,
    /// Auth endpoint rate limiting
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a required secret is missing
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let frontend_url = env_var_or("FRONTEND_URL", service::DEFAULT_FRONTEND_URL);

        let auth = AuthConfig {
            access_secret: env::var("JWT_ACCESS_SECRET")
                .context("JWT_ACCESS_SECRET must be set")?,
            refresh_secret: env::var("JWT_REFRESH_SECRET")
                .context("JWT_REFRESH_SECRET must be set")?,
            access_ttl: Duration::from_secs(
                env_var_or(
                    "ACCESS_TOKEN_TTL_SECS",
                    &tokens::DEFAULT_ACCESS_TOKEN_TTL_SECS.to_string(),
                )
                .parse()
                .context("Invalid ACCESS_TOKEN_TTL_SECS value")?,
            ),
            refresh_ttl: Duration::from_secs(
                env_var_or(
                    "REFRESH_TOKEN_TTL_SECS",
                    &tokens::DEFAULT_REFRESH_TOKEN_TTL_SECS.to_string(),
                )
                .parse()
                .context("Invalid REFRESH_TOKEN_TTL_SECS value")?,
            ),
        };

        let device = DeviceFlowConfig {
            code_ttl: Duration::from_secs(
                env_var_or(
                    "DEVICE_CODE_TTL_SECS",
                    &device::DEFAULT_DEVICE_CODE_TTL_SECS.to_string(),
                )
                .parse()
                .context("Invalid DEVICE_CODE_TTL_SECS value")?,
            ),
            poll_interval: Duration::from_secs(
                env_var_or(
                    "DEVICE_POLL_INTERVAL_SECS",
                    &device::DEFAULT_POLL_INTERVAL_SECS.to_string(),
                )
                .parse()
                .context("Invalid DEVICE_POLL_INTERVAL_SECS value")?,
            ),
            frontend_url: frontend_url.clone(),
        };

        let store = StoreConfig {
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            ..StoreConfig::default()
        };

        let oauth = OAuthConfig {
            google: provider_from_env("GOOGLE", |id, secret| {
                OAuthProviderConfig::google(id, secret)
            }),
            github: provider_from_env("GITHUB", |id, secret| {
                OAuthProviderConfig::github(id, secret)
            }),
            default_redirect_uri: env_var_or(
                "OAUTH_REDIRECT_URI",
                &format!("{}/auth/callback", frontend_url.trim_end_matches('/')),
            ),
        };

        let rate_limit = RateLimitConfig {
            max_requests: env_var_or("AUTH_RATE_LIMIT_REQUESTS", "10")
                .parse()
                .context("Invalid AUTH_RATE_LIMIT_REQUESTS value")?,
            window: Duration::from_secs(
                env_var_or("AUTH_RATE_LIMIT_WINDOW_SECS", "900")
                    .parse()
                    .context("Invalid AUTH_RATE_LIMIT_WINDOW_SECS value")?,
            ),
        };

        let config = Self {
            http_port: env_var_or("HTTP_PORT", "8080")
                .parse()
                .context("Invalid HTTP_PORT value")?,
            environment: Environment::from_str_or_default(&env_var_or(
                "ENVIRONMENT",
                "development",
            )),
            auth,
            device,
            store,
            database_url: env_var_or("DATABASE_URL", "sqlite::memory:"),
            oauth,
            cors_allowed_origins: parse_origins(&env_var_or("CORS_ALLOWED_ORIGINS", &frontend_url)),
            rate_limit,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if signing secrets are empty or identical, or lifetimes are zero
    pub fn validate(&self) -> Result<()> {
        if self.auth.access_secret.is_empty() || self.auth.refresh_secret.is_empty() {
            return Err(anyhow::anyhow!("JWT signing secrets cannot be empty"));
        }
        if self.auth.access_secret == self.auth.refresh_secret {
            return Err(anyhow::anyhow!(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ"
            ));
        }
        if self.auth.access_ttl.is_zero() || self.auth.refresh_ttl.is_zero() {
            return Err(anyhow::anyhow!("Token lifetimes must be positive"));
        }
        if self.device.code_ttl.is_zero() || self.device.poll_interval.is_zero() {
            return Err(anyhow::anyhow!(
                "DEVICE_CODE_TTL_SECS and DEVICE_POLL_INTERVAL_SECS must be positive"
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(anyhow::anyhow!("AUTH_RATE_LIMIT_REQUESTS must be positive"));
        }
        if self.oauth.google.is_none() && self.oauth.github.is_none() {
            warn!("No OAuth provider configured; web console login is unavailable");
        }
        Ok(())
    }

    /// One-line-per-setting summary safe for logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "TeamSync Server Configuration:\n\
             - HTTP Port: {}\n\
             - Environment: {}\n\
             - Frontend: {}\n\
             - Code Store: {}\n\
             - Database: {}\n\
             - Access Token TTL: {}s\n\
             - Refresh Token TTL: {}s\n\
             - Device Code TTL: {}s (poll every {}s)\n\
             - Google OAuth: {}\n\
             - GitHub OAuth: {}",
            self.http_port,
            self.environment,
            self.device.frontend_url,
            if self.store.redis_url.is_some() {
                "Redis"
            } else {
                "In-memory"
            },
            if self.database_url.contains(":memory:") {
                "SQLite (memory)"
            } else {
                "SQLite"
            },
            self.auth.access_ttl.as_secs(),
            self.auth.refresh_ttl.as_secs(),
            self.device.code_ttl.as_secs(),
            self.device.poll_interval.as_secs(),
            enabled(self.oauth.google.is_some()),
            enabled(self.oauth.github.is_some()),
        )
    }
}

const fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

/// Read `{PREFIX}_CLIENT_ID`/`{PREFIX}_CLIENT_SECRET` plus optional endpoint overrides
fn provider_from_env(
    prefix: &str,
    defaults: fn(String, String) -> OAuthProviderConfig,
) -> Option<OAuthProviderConfig> {
    let client_id = env::var(format!("{prefix}_CLIENT_ID")).ok()?;
    let client_secret = env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
    let mut config = defaults(client_id, client_secret);
    if let Ok(url) = env::var(format!("{prefix}_AUTH_URL")) {
        config.auth_url = url;
    }
    if let Ok(url) = env::var(format!("{prefix}_TOKEN_URL")) {
        config.token_url = url;
    }
    if let Ok(url) = env::var(format!("{prefix}_PROFILE_URL")) {
        config.profile_url = url;
    }
    Some(config)
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            http_port: 8080,
            environment: Environment::Testing,
            auth: AuthConfig::new("access", "refresh"),
            device: DeviceFlowConfig::new("http://localhost:3000/"),
            store: StoreConfig::default(),
            database_url: "sqlite::memory:".into(),
            oauth: OAuthConfig::default(),
            cors_allowed_origins: vec![],
            rate_limit: RateLimitConfig::default(),
        }
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(
            parse_origins("http://localhost:3000/, https://app.teamsync.dev"),
            vec!["http://localhost:3000", "https://app.teamsync.dev"]
        );
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_str_or_default("PROD"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_str_or_default("whatever"),
            Environment::Development
        );
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let mut config = config();
        config.auth.refresh_secret = "access".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verification_uri_strips_trailing_slash() {
        assert_eq!(
            config().device.verification_uri(),
            "http://localhost:3000/auth/device"
        );
    }

    #[test]
    fn test_auth_config_debug_redacts_secrets() {
        let rendered = format!("{:?}", AuthConfig::new("s3cret-a", "s3cret-b"));
        assert!(!rendered.contains("s3cret"));
    }
}
