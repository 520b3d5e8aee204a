// ABOUTME: Token codec and token lifecycle service
// ABOUTME: Signed access/refresh pairs, verification, rotation, and revocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! # Token Management
//!
//! [`TokenCodec`] is the stateless half: it mints and verifies JWTs and knows
//! nothing about storage. [`TokenService`] adds the stateful rules (refresh
//! rotation, single use, revocation) on top of the ephemeral store and the
//! user repository.

/// JWT minting and verification
pub mod codec;
/// Refresh rotation and revocation
pub mod service;

pub use codec::{AccessClaims, RefreshClaims, TokenCodec, TokenKind, TokenPair, TokenSubject};
pub use service::TokenService;
