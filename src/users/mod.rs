// ABOUTME: User account storage behind a repository trait
// ABOUTME: In-memory and SQLite backends plus the OAuth upsert policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

//! User accounts referenced by tokens and device approvals.

/// `DashMap` backend
pub mod memory;
/// OAuth login upsert policy
pub mod service;
/// `SQLite` backend
pub mod sqlite;

pub use memory::InMemoryUserRepository;
pub use service::UserService;
pub use sqlite::SqliteUserRepository;

use chrono::{DateTime, Utc};
use teamsync_core::errors::AppResult;
use teamsync_core::models::{AccountProvider, User};

/// Row CRUD for user accounts
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up by id
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;

    /// Look up by linked provider account
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn find_by_provider_id(
        &self,
        provider: AccountProvider,
        provider_id: &str,
    ) -> AppResult<Option<User>>;

    /// Look up by email, compared case-insensitively
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert a new account
    ///
    /// # Errors
    ///
    /// `ResourceAlreadyExists` if the id or email is taken
    async fn create(&self, user: &User) -> AppResult<()>;

    /// Replace an existing account
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` if no account has this id
    async fn update(&self, user: &User) -> AppResult<()>;

    /// Record a successful login
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` if no account has this id
    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> AppResult<()>;
}
