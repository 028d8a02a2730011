// ABOUTME: SQLite-backed repository implementations and schema migration
// ABOUTME: Users, refresh-token set and action tokens persisted through sqlx
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ActionTokenRepository, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{ActionToken, ActionTokenKind, User};
use crate::oauth::Provider;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// `SQLite`-backed durable store
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run schema migration
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT,
                google_id TEXT UNIQUE,
                github_id TEXT UNIQUE,
                registered_with_google BOOLEAN NOT NULL DEFAULT 0,
                registered_with_github BOOLEAN NOT NULL DEFAULT 0,
                referral_code TEXT UNIQUE NOT NULL,
                referrer_id TEXT,
                trial_end_date INTEGER NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 0,
                is_two_factor_enabled BOOLEAN NOT NULL DEFAULT 0,
                email_requests INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to migrate users: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_refresh_tokens (
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, token)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to migrate refresh tokens: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS action_tokens (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                new_value TEXT,
                created_at INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to migrate action tokens: {e}")))?;

        // Owned by the project subsystem; created here so a fresh database
        // serves shared-project reads without external setup.
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS project_members (
                project_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                PRIMARY KEY (project_id, user_id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to migrate project members: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_action_tokens_user ON action_tokens(user_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create index: {e}")))?;

        Ok(())
    }

    fn row_to_user(row: &SqliteRow) -> AppResult<User> {
        let id: String = row.get("id");
        let referrer_id: Option<String> = row.get("referrer_id");
        let trial_end: i64 = row.get("trial_end_date");
        let created: i64 = row.get("created_at");
        let email_requests: i64 = row.get("email_requests");

        Ok(User {
            id: parse_uuid(&id)?,
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            google_id: row.get("google_id"),
            github_id: row.get("github_id"),
            registered_with_google: row.get("registered_with_google"),
            registered_with_github: row.get("registered_with_github"),
            referral_code: row.get("referral_code"),
            referrer_id: referrer_id.as_deref().map(parse_uuid).transpose()?,
            trial_end_date: parse_timestamp(trial_end)?,
            is_active: row.get("is_active"),
            is_two_factor_enabled: row.get("is_two_factor_enabled"),
            email_requests: u32::try_from(email_requests).unwrap_or(0),
            created_at: parse_timestamp(created)?,
        })
    }

    async fn fetch_user_where(&self, clause: &str, value: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT * FROM users WHERE {clause} = $1");
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query user: {e}")))?;

        row.as_ref().map(Self::row_to_user).transpose()
    }
}

fn parse_uuid(s: &str) -> AppResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::database(format!("Invalid UUID in database: {e}")))
}

fn parse_timestamp(ts: i64) -> AppResult<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| AppError::database(format!("Invalid timestamp in database: {ts}")))
}

#[async_trait::async_trait]
impl UserRepository for Database {
    async fn create(&self, user: &User) -> AppResult<()> {
        if self.find_by_email(&user.email).await?.is_some() {
            return Err(AppError::already_exists("Email already in use"));
        }
        for provider in [Provider::Google, Provider::GitHub] {
            if let Some(external_id) = user.external_id(provider) {
                if self.find_by_external_id(provider, external_id).await?.is_some() {
                    return Err(AppError::already_exists(format!(
                        "{provider} identity already in use"
                    )));
                }
            }
        }

        sqlx::query(
            r"
            INSERT INTO users (
                id, email, password_hash, google_id, github_id,
                registered_with_google, registered_with_github,
                referral_code, referrer_id, trial_end_date,
                is_active, is_two_factor_enabled, email_requests, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(&user.github_id)
        .bind(user.registered_with_google)
        .bind(user.registered_with_github)
        .bind(&user.referral_code)
        .bind(user.referrer_id.map(|id| id.to_string()))
        .bind(user.trial_end_date.timestamp())
        .bind(user.is_active)
        .bind(user.is_two_factor_enabled)
        .bind(i64::from(user.email_requests))
        .bind(user.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create user: {e}")))?;

        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET
                email = $2,
                password_hash = $3,
                google_id = $4,
                github_id = $5,
                registered_with_google = $6,
                registered_with_github = $7,
                referral_code = $8,
                referrer_id = $9,
                trial_end_date = $10,
                is_active = $11,
                is_two_factor_enabled = $12,
                email_requests = $13
            WHERE id = $1
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(&user.github_id)
        .bind(user.registered_with_google)
        .bind(user.registered_with_github)
        .bind(&user.referral_code)
        .bind(user.referrer_id.map(|id| id.to_string()))
        .bind(user.trial_end_date.timestamp())
        .bind(user.is_active)
        .bind(user.is_two_factor_enabled)
        .bind(i64::from(user.email_requests))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update user: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        self.fetch_user_where("id", &id.to_string()).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.fetch_user_where("email", email).await
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> AppResult<Option<User>> {
        let column = match provider {
            Provider::Google => "google_id",
            Provider::GitHub => "github_id",
        };
        self.fetch_user_where(column, external_id).await
    }

    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        self.fetch_user_where("referral_code", code).await
    }

    async fn add_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_refresh_tokens (user_id, token, created_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id.to_string())
        .bind(token)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to store refresh token: {e}")))?;
        Ok(())
    }

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM user_refresh_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id.to_string())
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to remove refresh token: {e}")))?;
        Ok(())
    }

    async fn clear_refresh_tokens(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM user_refresh_tokens WHERE user_id = $1")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear refresh tokens: {e}")))?;
        Ok(())
    }

    async fn refresh_token_exists(&self, user_id: Uuid, token: &str) -> AppResult<bool> {
        let row =
            sqlx::query("SELECT 1 FROM user_refresh_tokens WHERE user_id = $1 AND token = $2")
                .bind(user_id.to_string())
                .bind(token)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to query refresh token: {e}")))?;
        Ok(row.is_some())
    }

    async fn shared_project_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT project_id FROM project_members WHERE user_id = $1")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query shared projects: {e}")))?;

        rows.iter()
            .map(|row| parse_uuid(&row.get::<String, _>("project_id")))
            .collect()
    }
}

#[async_trait::async_trait]
impl ActionTokenRepository for Database {
    async fn insert(&self, token: &ActionToken) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO action_tokens (id, user_id, kind, new_value, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&token.id)
        .bind(token.user_id.to_string())
        .bind(token.kind.as_str())
        .bind(&token.new_value)
        .bind(token.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to store action token: {e}")))?;
        Ok(())
    }

    async fn find(&self, id: &str) -> AppResult<Option<ActionToken>> {
        let row = sqlx::query("SELECT * FROM action_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query action token: {e}")))?;

        row.map(|row| {
            let kind: String = row.get("kind");
            let user_id: String = row.get("user_id");
            let created: i64 = row.get("created_at");
            Ok(ActionToken {
                id: row.get("id"),
                user_id: parse_uuid(&user_id)?,
                kind: kind.parse::<ActionTokenKind>()?,
                new_value: row.get("new_value"),
                created_at: parse_timestamp(created)?,
            })
        })
        .transpose()
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM action_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete action token: {e}")))?;
        Ok(())
    }
}
