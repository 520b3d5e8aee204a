// ABOUTME: Logging configuration and structured logging setup for the server and CLI
// ABOUTME: Environment-driven tracing subscriber plus helpers for structured auth events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! Structured logging with `tracing`
//!
//! Device codes and tokens are secrets and never appear in log fields. User
//! codes are short-lived and shown to the user anyway, so they may.

use anyhow::{anyhow, Result};
use std::env;
use std::io;
use teamsync_core::constants::service::SERVICE_NAME;
use tracing::{info, warn};
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Dependencies that are chatty at `debug`
const NOISE_DIRECTIVES: &[&str] = &[
    "hyper=warn",
    "hyper_util=warn",
    "h2=warn",
    "reqwest=warn",
    "sqlx=warn",
    "redis=warn",
    "tower_http=info",
];

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include thread ids and names
    pub include_thread: bool,
    /// Emit span open and close events
    pub include_spans: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Deployment environment
    pub environment: String,
    /// Write to stderr, keeping stdout for command output
    pub use_stderr: bool,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for production
    Json,
    /// Multi-field human format, for development
    Pretty,
    /// Single-line human format
    Compact,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("json") => Self::Json,
            Some("compact") => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            include_thread: false,
            include_spans: false,
            service_name: SERVICE_NAME.into(),
            environment: "development".into(),
            use_stderr: false,
        }
    }
}

impl LoggingConfig {
    /// Server logging from `RUST_LOG`, `LOG_FORMAT`, and `ENVIRONMENT`
    #[must_use]
    pub fn from_env() -> Self {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_production = environment == "production";

        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            format: LogFormat::from_env_value(env::var("LOG_FORMAT").ok().as_deref()),
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_thread: env::var("LOG_INCLUDE_THREAD").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.into()),
            environment,
            use_stderr: false,
        }
    }

    /// CLI logging: quiet by default, compact, on stderr
    #[must_use]
    pub fn for_cli(verbose: bool) -> Self {
        Self {
            level: env::var("RUST_LOG")
                .unwrap_or_else(|_| String::from(if verbose { "debug" } else { "warn" })),
            format: LogFormat::Compact,
            service_name: "teamsync-cli".into(),
            use_stderr: true,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| anyhow!("Invalid log level '{}': {e}", self.level))?;
        for directive in NOISE_DIRECTIVES {
            filter = filter.add_directive(parse_directive(directive)?);
        }
        // Application targets follow the configured level even if a noise rule is broader
        if !self.level.contains('=') {
            filter = filter.add_directive(parse_directive(&format!("teamsync={}", self.level))?);
        }
        Ok(filter)
    }

    /// Install the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if the level is not a valid filter or a global
    /// subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter()?);
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_thread_ids(self.include_thread)
            .with_thread_names(self.include_thread)
            .with_span_events(span_events);

        // Each arm has a distinct layer type, so installation happens per arm
        let result = match (self.format, self.use_stderr) {
            (LogFormat::Json, false) => registry.with(layer.json().with_writer(io::stdout)).try_init(),
            (LogFormat::Json, true) => registry.with(layer.json().with_writer(io::stderr)).try_init(),
            (LogFormat::Pretty, false) => registry.with(layer.with_writer(io::stdout)).try_init(),
            (LogFormat::Pretty, true) => registry.with(layer.with_writer(io::stderr)).try_init(),
            (LogFormat::Compact, false) => registry
                .with(layer.compact().with_target(false).with_writer(io::stdout))
                .try_init(),
            (LogFormat::Compact, true) => registry
                .with(layer.compact().with_target(false).with_writer(io::stderr))
                .try_init(),
        };
        result.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))?;

        info!(
            service.name = %self.service_name,
            service.version = env!("CARGO_PKG_VERSION"),
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Logging initialized"
        );
        Ok(())
    }
}

fn parse_directive(directive: &str) -> Result<Directive> {
    directive
        .parse()
        .map_err(|e| anyhow!("Invalid log directive '{directive}': {e}"))
}

/// Initialize logging from the environment
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Structured events for the authentication flows
pub struct AuthLogger;

impl AuthLogger {
    /// Device flow and token lifecycle events
    pub fn log_auth_event(user_id: Option<&str>, event: &str, success: bool, details: Option<&str>) {
        if success {
            info!(
                user.id = user_id.unwrap_or("anonymous"),
                auth.event = %event,
                auth.success = true,
                "Authentication event"
            );
        } else {
            warn!(
                user.id = user_id.unwrap_or("anonymous"),
                auth.event = %event,
                auth.success = false,
                auth.details = details.unwrap_or(""),
                "Authentication event failed"
            );
        }
    }

    /// Provider login events
    pub fn log_oauth_event(user_id: Option<&str>, provider: &str, event: &str, success: bool) {
        info!(
            user.id = user_id.unwrap_or("anonymous"),
            oauth.provider = %provider,
            oauth.event = %event,
            oauth.success = %success,
            "OAuth event"
        );
    }

    /// Rejected or suspicious requests
    pub fn log_security_event(event_type: &str, details: &str, user_id: Option<&str>) {
        warn!(
            security.event = %event_type,
            security.details = %details,
            user.id = user_id.unwrap_or("unknown"),
            "Security event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_env_value(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("compact")), LogFormat::Compact);
        assert_eq!(LogFormat::from_env_value(Some("fancy")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Pretty);
    }

    #[test]
    fn test_env_filter_accepts_levels_and_directives() {
        let mut config = LoggingConfig::default();
        assert!(config.env_filter().is_ok());
        config.level = "teamsync=debug,tower_http=trace".into();
        assert!(config.env_filter().is_ok());
    }
}
