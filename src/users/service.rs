// ABOUTME: Account resolution for OAuth logins
// ABOUTME: Matches by provider id, then by email, and creates the account otherwise
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::UserRepository;
use crate::errors::{AuthFlowError, AuthFlowResult};
use crate::oauth2_client::UserIdentity;
use chrono::Utc;
use std::sync::Arc;
use teamsync_core::models::{normalize_email, AccountProvider, User};
use tracing::{info, warn};

/// Resolves provider identities to local accounts
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    /// Wrap a repository
    #[must_use]
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Find or create the account for a provider identity and record the login
    ///
    /// Resolution order:
    /// 1. an account already linked to `(provider, provider_id)`;
    /// 2. an account with the same email, which gets the provider attached only
    ///    when the provider verified that email;
    /// 3. a new account.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when an unverified email matches an existing account;
    /// `Internal` if the repository fails
    pub async fn upsert_oauth_user(&self, identity: &UserIdentity) -> AuthFlowResult<User> {
        let provider = AccountProvider::from(identity.provider);
        let now = Utc::now();

        if let Some(mut user) = self
            .repo
            .find_by_provider_id(provider, &identity.provider_id)
            .await?
        {
            user.name.clone_from(&identity.name);
            if identity.avatar.is_some() {
                user.avatar.clone_from(&identity.avatar);
            }
            user.updated_at = now;
            user.last_login_at = Some(now);
            self.repo.update(&user).await?;
            return Ok(user);
        }

        if let Some(mut user) = self.repo.find_by_email(&identity.email).await? {
            if !identity.email_verified {
                warn!(
                    user.id = %user.id,
                    oauth.provider = %identity.provider,
                    "Refusing to link an unverified provider email to an existing account"
                );
                return Err(AuthFlowError::AccessDenied);
            }
            info!(
                user.id = %user.id,
                oauth.provider = %identity.provider,
                "Linking OAuth provider to existing account"
            );
            user.provider = provider;
            user.provider_id = Some(identity.provider_id.clone());
            if user.avatar.is_none() {
                user.avatar.clone_from(&identity.avatar);
            }
            user.email_verified = user.email_verified || identity.email_verified;
            user.updated_at = now;
            user.last_login_at = Some(now);
            self.repo.update(&user).await?;
            return Ok(user);
        }

        let mut user = User::new(&normalize_email(&identity.email), identity.name.clone(), provider);
        user.avatar.clone_from(&identity.avatar);
        user.provider_id = Some(identity.provider_id.clone());
        user.email_verified = identity.email_verified;
        user.last_login_at = Some(now);
        self.repo.create(&user).await?;
        info!(
            user.id = %user.id,
            oauth.provider = %identity.provider,
            "Created account from OAuth login"
        );
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::InMemoryUserRepository;
    use teamsync_core::models::OAuthProvider;

    fn identity(provider: OAuthProvider, provider_id: &str, email: &str) -> UserIdentity {
        UserIdentity {
            provider,
            provider_id: provider_id.into(),
            email: email.into(),
            name: "Dana".into(),
            avatar: Some("https://avatars.example/dana.png".into()),
            email_verified: true,
        }
    }

    #[tokio::test]
    async fn test_email_match_attaches_provider() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let existing = User::new("dana@teamsync.dev", "Dana", AccountProvider::Email);
        repo.create(&existing).await.unwrap();
        let service = UserService::new(repo.clone());

        let user = service
            .upsert_oauth_user(&identity(OAuthProvider::Github, "gh-1", "Dana@TeamSync.dev"))
            .await
            .unwrap();

        assert_eq!(user.id, existing.id);
        assert_eq!(user.provider, AccountProvider::Github);
        assert_eq!(user.provider_id.as_deref(), Some("gh-1"));
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_unverified_email_does_not_take_over_account() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let existing = User::new("dana@teamsync.dev", "Dana", AccountProvider::Email);
        repo.create(&existing).await.unwrap();
        let service = UserService::new(repo.clone());

        let mut unverified = identity(OAuthProvider::Github, "gh-2", "dana@teamsync.dev");
        unverified.email_verified = false;
        let err = service.upsert_oauth_user(&unverified).await.unwrap_err();
        assert!(matches!(err, AuthFlowError::AccessDenied));

        let stored = repo.find_by_id(&existing.id).await.unwrap().unwrap();
        assert_eq!(stored.provider, AccountProvider::Email);
        assert_eq!(stored.provider_id, None);
    }

    #[tokio::test]
    async fn test_provider_match_wins_over_email() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = UserService::new(repo.clone());

        let first = service
            .upsert_oauth_user(&identity(OAuthProvider::Google, "g-1", "dana@teamsync.dev"))
            .await
            .unwrap();
        // Same provider account, email changed at the provider
        let second = service
            .upsert_oauth_user(&identity(OAuthProvider::Google, "g-1", "dana@new.example"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_new_identity_creates_account() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = UserService::new(repo.clone());

        let user = service
            .upsert_oauth_user(&identity(OAuthProvider::Github, "gh-9", "new@teamsync.dev"))
            .await
            .unwrap();

        assert_eq!(
            repo.find_by_id(&user.id).await.unwrap().map(|u| u.email),
            Some("new@teamsync.dev".to_owned())
        );
    }
}
