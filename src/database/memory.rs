// ABOUTME: In-memory repository fakes backing tests and single-process deployments
// ABOUTME: RwLock-guarded maps mirroring the SQL implementation's semantics
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ActionTokenRepository, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{ActionToken, User};
use crate::oauth::Provider;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct UserState {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<Uuid, HashSet<String>>,
    shared_projects: HashMap<Uuid, Vec<Uuid>>,
}

/// In-memory user repository
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    state: Arc<RwLock<UserState>>,
}

impl InMemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed shared-project associations for a user (test support)
    pub async fn set_shared_projects(&self, user_id: Uuid, projects: Vec<Uuid>) {
        self.state.write().await.shared_projects.insert(user_id, projects);
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AppError::already_exists("Email already in use"));
        }
        for provider in [Provider::Google, Provider::GitHub] {
            if let Some(external_id) = user.external_id(provider) {
                if state
                    .users
                    .values()
                    .any(|u| u.external_id(provider) == Some(external_id))
                {
                    return Err(AppError::already_exists(format!(
                        "{provider} identity already in use"
                    )));
                }
            }
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(AppError::not_found("User"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> AppResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.external_id(provider) == Some(external_id))
            .cloned())
    }

    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.referral_code == code)
            .cloned())
    }

    async fn add_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        self.state
            .write()
            .await
            .refresh_tokens
            .entry(user_id)
            .or_default()
            .insert(token.to_owned());
        Ok(())
    }

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        if let Some(set) = self.state.write().await.refresh_tokens.get_mut(&user_id) {
            set.remove(token);
        }
        Ok(())
    }

    async fn clear_refresh_tokens(&self, user_id: Uuid) -> AppResult<()> {
        self.state.write().await.refresh_tokens.remove(&user_id);
        Ok(())
    }

    async fn refresh_token_exists(&self, user_id: Uuid, token: &str) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .refresh_tokens
            .get(&user_id)
            .is_some_and(|set| set.contains(token)))
    }

    async fn shared_project_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state
            .read()
            .await
            .shared_projects
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory action-token repository
#[derive(Clone, Default)]
pub struct InMemoryActionTokenRepository {
    tokens: Arc<RwLock<HashMap<String, ActionToken>>>,
}

impl InMemoryActionTokenRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ActionTokenRepository for InMemoryActionTokenRepository {
    async fn insert(&self, token: &ActionToken) -> AppResult<()> {
        self.tokens
            .write()
            .await
            .insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> AppResult<Option<ActionToken>> {
        Ok(self.tokens.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.tokens.write().await.remove(id);
        Ok(())
    }
}
