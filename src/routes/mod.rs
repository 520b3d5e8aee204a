// ABOUTME: Route module organization for the TeamSync auth service
// ABOUTME: Authentication endpoints and the health check
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

/// Device flow, token, and OAuth login routes
pub mod auth;
/// Health check route
pub mod health;

pub use auth::AuthRoutes;
pub use health::HealthRoutes;
