// ABOUTME: Presentation of the verification step to the person at the keyboard
// ABOUTME: Trait seam for editor UIs plus a terminal implementation that can open a browser
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use std::process::{Command, Stdio};
use tracing::debug;

/// Shows the user code and reports the login result
///
/// Editor integrations render these as notifications; the CLI prints them.
pub trait VerificationPrompt: Send + Sync {
    /// Ask the user to enter `user_code` at `verification_uri`
    fn show_code(&self, user_code: &str, verification_uri: &str, verification_uri_complete: Option<&str>);

    /// Login finished
    fn on_success(&self);

    /// Login ended without tokens
    fn on_failure(&self, message: &str);
}

/// Terminal prompt on stderr, leaving stdout for command output
#[derive(Debug, Clone, Copy)]
pub struct ConsolePrompt {
    open_browser: bool,
}

impl ConsolePrompt {
    /// `open_browser` launches the system browser at the verification page
    #[must_use]
    pub const fn new(open_browser: bool) -> Self {
        Self { open_browser }
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new(true)
    }
}

impl VerificationPrompt for ConsolePrompt {
    fn show_code(&self, user_code: &str, verification_uri: &str, verification_uri_complete: Option<&str>) {
        eprintln!();
        eprintln!("To sign in, open {verification_uri}");
        eprintln!("and enter the code: {user_code}");
        eprintln!();

        if self.open_browser {
            let target = verification_uri_complete.unwrap_or(verification_uri);
            if let Err(e) = open_in_browser(target) {
                debug!("Could not launch a browser: {}", e);
                eprintln!("(Could not open a browser automatically)");
            }
        }
        eprintln!("Waiting for approval...");
    }

    fn on_success(&self) {
        eprintln!("Signed in to TeamSync.");
    }

    fn on_failure(&self, message: &str) {
        eprintln!("Sign-in failed: {message}");
    }
}

/// Hand `url` to the platform opener without waiting for it
fn open_in_browser(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}
