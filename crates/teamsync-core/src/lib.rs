// ABOUTME: Core types and constants for the TeamSync auth service
// ABOUTME: Foundation crate with error handling, wire models, and protocol constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

#![deny(unsafe_code)]

//! # TeamSync Core
//!
//! Foundation crate shared by the TeamSync server and the editor-side client.
//! It changes rarely and carries no I/O.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Protocol constants (client id, lifetimes, store key prefixes)
//! - **models**: Wire types for the device flow, tokens, and user records

/// Infrastructure error type with standard error codes
pub mod errors;

/// Protocol constants organized by domain
pub mod constants;

/// Wire types and user records
pub mod models;
