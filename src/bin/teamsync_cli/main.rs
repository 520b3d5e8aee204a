// ABOUTME: TeamSync CLI - sign in to TeamSync from a terminal with the device flow
// ABOUTME: Handles login, logout, session status, and printing a fresh access token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! Usage:
//! ```bash
//! # Sign in (prints a code and opens the approval page)
//! teamsync-cli login
//!
//! # Sign in on a machine without a browser
//! teamsync-cli login --no-browser
//!
//! # Show whether a usable session exists
//! teamsync-cli status
//!
//! # Print a fresh access token for scripts
//! curl -H "Authorization: Bearer $(teamsync-cli token)" https://api.teamsync.dev/auth/me
//!
//! # Sign out
//! teamsync-cli logout
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use teamsync::client::{AuthApi, AuthSession, ConsolePrompt, FileSecretStore, SessionConfig};
use teamsync::constants::service::DEFAULT_API_URL;
use teamsync::logging::LoggingConfig;

#[derive(Parser)]
#[command(
    name = "teamsync-cli",
    about = "TeamSync command-line sign-in",
    long_about = "Signs in to TeamSync with a device code approved in the browser, and manages the stored session."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TeamSync API base URL
    #[arg(long, global = true, env = "TEAMSYNC_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Token file override (defaults to the user config directory)
    #[arg(long, global = true, env = "TEAMSYNC_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Sign in with a device code
    Login {
        /// Print the approval URL without opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Revoke the session and delete stored tokens
    Logout,

    /// Show whether a usable session exists
    Status,

    /// Print a valid access token, refreshing it if needed
    Token,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    LoggingConfig::for_cli(cli.verbose).init()?;

    let store = match cli.token_file {
        Some(path) => FileSecretStore::new(path),
        None => FileSecretStore::default_location()
            .context("No config directory found; pass --token-file")?,
    };

    let open_browser = !matches!(cli.command, Command::Login { no_browser: true });
    let session = AuthSession::new(
        AuthApi::new(cli.api_url),
        Arc::new(store),
        Arc::new(ConsolePrompt::new(open_browser)),
        SessionConfig::from_env(),
    );

    let succeeded = match cli.command {
        Command::Login { .. } => commands::auth::login(&session).await,
        Command::Logout => commands::auth::logout(&session).await,
        Command::Status => commands::auth::status(&session).await,
        Command::Token => commands::auth::token(&session).await,
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
