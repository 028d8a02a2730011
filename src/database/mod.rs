// ABOUTME: Repository abstractions over the durable user and action-token stores
// ABOUTME: Minimal injected interfaces so core logic tests against in-memory fakes
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Durable Store Repositories
//!
//! The core never talks to a concrete database; it is handed these traits.
//! Production wires the `SQLite` implementation in [`sql`], tests wire the
//! in-memory fakes in [`memory`].

/// In-memory repository implementations
pub mod memory;
/// `SQLite`-backed repository implementations
pub mod sql;

use crate::errors::AppResult;
use crate::models::{ActionToken, User};
use crate::oauth::Provider;
use uuid::Uuid;

/// Durable user store
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email or a linked external id is already taken
    async fn create(&self, user: &User) -> AppResult<()>;

    /// Replace the stored row for `user.id`
    ///
    /// # Errors
    ///
    /// Returns an error if the user does not exist or the write fails
    async fn update(&self, user: &User) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Look up the single user holding this provider external id, if any
    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> AppResult<Option<User>>;

    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<User>>;

    /// Append a refresh token to the user's revocable set
    async fn add_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()>;

    /// Remove one refresh token from the user's set
    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()>;

    /// Remove every refresh token the user holds
    async fn clear_refresh_tokens(&self, user_id: Uuid) -> AppResult<()>;

    /// Membership test against the user's persisted set
    async fn refresh_token_exists(&self, user_id: Uuid, token: &str) -> AppResult<bool>;

    /// Projects shared with this user, returned with the full session
    async fn shared_project_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;
}

/// Durable action-token store
#[async_trait::async_trait]
pub trait ActionTokenRepository: Send + Sync {
    async fn insert(&self, token: &ActionToken) -> AppResult<()>;

    async fn find(&self, id: &str) -> AppResult<Option<ActionToken>>;

    async fn delete(&self, id: &str) -> AppResult<()>;
}
