// ABOUTME: Process-local user repository backed by DashMap
// ABOUTME: Used by tests and single-instance development servers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::UserRepository;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use teamsync_core::errors::{AppError, AppResult, ErrorCode};
use teamsync_core::models::{normalize_email, AccountProvider, User};

/// User repository held in memory
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
}

impl InMemoryUserRepository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_provider_id(
        &self,
        provider: AccountProvider,
        provider_id: &str,
    ) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| {
                entry.provider == provider && entry.provider_id.as_deref() == Some(provider_id)
            })
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        Ok(self
            .users
            .iter()
            .find(|entry| entry.email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn create(&self, user: &User) -> AppResult<()> {
        if self.users.iter().any(|entry| entry.email == user.email) {
            return Err(AppError::new(
                ErrorCode::ResourceAlreadyExists,
                "A user with this email already exists",
            ));
        }
        match self.users.entry(user.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::new(
                ErrorCode::ResourceAlreadyExists,
                "A user with this id already exists",
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let mut existing = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::not_found("User"))?;
        *existing = user.clone();
        Ok(())
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> AppResult<()> {
        let mut existing = self
            .users
            .get_mut(id)
            .ok_or_else(|| AppError::not_found("User"))?;
        existing.last_login_at = Some(at);
        existing.updated_at = at;
        Ok(())
    }
}
