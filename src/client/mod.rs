// ABOUTME: Device-flow client used by editor integrations and the CLI
// ABOUTME: HTTP API wrapper, token persistence, verification prompts, and the login session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! # Client Poller
//!
//! [`AuthSession`] drives the device flow from the client side: it requests a
//! code, shows it through a [`VerificationPrompt`], polls until the server
//! issues tokens, and keeps the persisted pair fresh afterwards.

/// HTTP calls to the authorization service
pub mod api;
/// User-facing presentation of the verification step
pub mod prompt;
/// Login session orchestration
pub mod session;
/// Token persistence
pub mod store;

pub use api::{AuthApi, ClientError, PollOutcome};
pub use prompt::{ConsolePrompt, VerificationPrompt};
pub use session::{AuthSession, SessionConfig};
pub use store::{FileSecretStore, MemorySecretStore, SecretStore, StoredTokens};
