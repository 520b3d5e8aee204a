// ABOUTME: SQLite user repository using sqlx
// ABOUTME: Creates its schema on startup and maps rows to the shared User model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

use super::UserRepository;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use teamsync_core::errors::{AppError, AppResult};
use teamsync_core::models::{normalize_email, AccountProvider, User};

const USER_COLUMNS: &str = "id, email, name, avatar, provider, provider_id, email_verified, \
                            created_at, updated_at, last_login_at";

/// User repository stored in `SQLite`
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Open the database at `database_url` and create the schema
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the database cannot be opened, or
    /// migration fails
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid DATABASE_URL: {e}")))?
            .create_if_missing(true);

        let pool = Self::pool_options(database_url)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Every connection to `:memory:` opens a separate database, so an in-memory
    /// pool holds exactly one connection and never lets it be reaped
    fn pool_options(database_url: &str) -> SqlitePoolOptions {
        if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        }
    }

    /// Create the users table and indexes
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                avatar TEXT,
                provider TEXT NOT NULL DEFAULT 'email' CHECK (provider IN ('google', 'github', 'email')),
                provider_id TEXT,
                email_verified BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                last_login_at DATETIME
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_users_provider ON users(provider, provider_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_one_where(&self, clause: &str, binds: &[&str]) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let mut statement = sqlx::query(&query);
        for value in binds {
            statement = statement.bind(*value);
        }
        let row = statement.fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    fn row_to_user(row: &SqliteRow) -> AppResult<User> {
        let provider: String = row.try_get("provider")?;
        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            avatar: row.try_get("avatar")?,
            provider: AccountProvider::from_db(&provider),
            provider_id: row.try_get("provider_id")?,
            email_verified: row.try_get("email_verified")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_login_at: row.try_get("last_login_at")?,
        })
    }
}

#[async_trait::async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        self.fetch_one_where("id = $1", &[id]).await
    }

    async fn find_by_provider_id(
        &self,
        provider: AccountProvider,
        provider_id: &str,
    ) -> AppResult<Option<User>> {
        self.fetch_one_where(
            "provider = $1 AND provider_id = $2",
            &[provider.as_str(), provider_id],
        )
        .await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        self.fetch_one_where("email = $1", &[email.as_str()]).await
    }

    async fn create(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, email, name, avatar, provider, provider_id, email_verified,
                               created_at, updated_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(user.provider.as_str())
        .bind(&user.provider_id)
        .bind(user.email_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET email = $2, name = $3, avatar = $4, provider = $5, provider_id = $6,
                email_verified = $7, updated_at = $8, last_login_at = $9
            WHERE id = $1
            ",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(user.provider.as_str())
        .bind(&user.provider_id)
        .bind(user.email_verified)
        .bind(user.updated_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET last_login_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_lookup_by_provider() {
        let repo = SqliteUserRepository::connect("sqlite::memory:").await.unwrap();
        let mut user = User::new("Dev@TeamSync.dev", "Dev", AccountProvider::Github);
        user.provider_id = Some("gh-7".into());
        repo.create(&user).await.unwrap();

        let found = repo
            .find_by_provider_id(AccountProvider::Github, "gh-7")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.email, "dev@teamsync.dev");

        let by_email = repo.find_by_email("DEV@teamsync.dev").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));
    }

    #[test]
    fn test_memory_pool_keeps_its_connection() {
        let options = SqliteUserRepository::pool_options("sqlite::memory:");
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);

        let file = SqliteUserRepository::pool_options("sqlite://users.db");
        assert_eq!(file.get_max_connections(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = SqliteUserRepository::connect("sqlite::memory:").await.unwrap();
        repo.create(&User::new("a@teamsync.dev", "A", AccountProvider::Email))
            .await
            .unwrap();
        let err = repo
            .create(&User::new("a@teamsync.dev", "B", AccountProvider::Google))
            .await
            .unwrap_err();
        assert_eq!(
            err.code,
            teamsync_core::errors::ErrorCode::ResourceAlreadyExists
        );
    }

    #[tokio::test]
    async fn test_touch_missing_user_is_not_found() {
        let repo = SqliteUserRepository::connect("sqlite::memory:").await.unwrap();
        let err = repo.touch_last_login("nobody", Utc::now()).await.unwrap_err();
        assert_eq!(err.code, teamsync_core::errors::ErrorCode::ResourceNotFound);
    }
}
