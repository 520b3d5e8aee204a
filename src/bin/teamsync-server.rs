// ABOUTME: TeamSync authorization server binary
// ABOUTME: Loads configuration from the environment, opens backends, and serves the auth API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! # TeamSync Server Binary
//!
//! Serves device-code authorization, OAuth console login, and token refresh
//! and revocation over HTTP.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use teamsync::{config::ServerConfig, logging, server, server::ServerResources};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "teamsync-server")]
#[command(about = "TeamSync auth service - device-code login for the editor extension")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting TeamSync auth server");
    info!("{}", config.summary());

    let resources = Arc::new(ServerResources::initialize(config).await?);
    display_available_endpoints(&resources);

    if let Err(e) = server::run(resources, CancellationToken::new()).await {
        error!("Server error: {:#}", e);
        return Err(e);
    }

    Ok(())
}

fn display_available_endpoints(resources: &ServerResources) {
    let port = resources.config.http_port;
    info!("=== Available API Endpoints ===");
    info!("Device flow:");
    info!("  POST http://localhost:{port}/auth/device");
    info!("  POST http://localhost:{port}/auth/token");
    info!("  POST http://localhost:{port}/auth/device/approve");
    info!("Tokens:");
    info!("  POST http://localhost:{port}/auth/refresh");
    info!("  POST http://localhost:{port}/auth/revoke");
    info!("  POST http://localhost:{port}/auth/logout");
    info!("  GET  http://localhost:{port}/auth/me");
    info!("OAuth:");
    info!("  GET  http://localhost:{port}/auth/oauth/{{provider}}/url");
    info!("  POST http://localhost:{port}/auth/oauth/callback");
    info!("Health:");
    info!("  GET  http://localhost:{port}/health");
}
