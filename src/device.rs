// ABOUTME: Device authorization flow for input-constrained clients
// ABOUTME: Code generation and the broker state machine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! # Device Authorization
//!
//! ```text
//! pending --approve--> approved --poll (consumes)--> issued
//!    |                    |
//!    +------ TTL ---------+-----------------------> expired
//! ```
//!
//! No transition leaves a terminal state.

/// `DeviceAuthorizationBroker` and poll outcomes
pub mod broker;
/// Device and user code generation
pub mod codes;

pub use broker::{Approval, DeviceAuthorizationBroker, PendingAuthorization, PollOutcome};
pub use codes::normalize_user_code;
