// ABOUTME: Session commands for teamsync-cli
// ABOUTME: Login with Ctrl-C cancellation, logout, status, and token printing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use teamsync::client::AuthSession;
use tracing::debug;

/// Run the device flow; Ctrl-C stops polling
pub async fn login(session: &AuthSession) -> bool {
    if session.is_authenticated().await {
        eprintln!("Already signed in. Run `teamsync-cli logout` first to switch accounts.");
        return true;
    }

    let cancel = session.shutdown_token();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling login");
            cancel.cancel();
        }
    });

    let signed_in = session.login().await;
    watcher.abort();
    signed_in
}

/// Revoke and forget the stored session
pub async fn logout(session: &AuthSession) -> bool {
    session.logout().await;
    eprintln!("Signed out.");
    true
}

/// Report whether a usable session exists
pub async fn status(session: &AuthSession) -> bool {
    if session.is_authenticated().await {
        println!("Signed in");
        true
    } else {
        println!("Not signed in");
        false
    }
}

/// Print a valid access token on stdout
pub async fn token(session: &AuthSession) -> bool {
    match session.get_access_token().await {
        Some(token) => {
            println!("{token}");
            true
        }
        None => {
            eprintln!("Not signed in. Run `teamsync-cli login`.");
            false
        }
    }
}
