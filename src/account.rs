// ABOUTME: Account linker - resolves a consumed SSO identity to a user
// ABOUTME: Provision/login/link/unlink with the one-external-id-per-user invariant
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Account Linker
//!
//! Consumes the pending session exactly once and resolves the identity it
//! held: provision a new account, log an existing one in (possibly gated
//! behind a second factor), or attach/detach the identity on an existing
//! account. Referral attribution is best-effort and never blocks
//! registration.

use crate::database::UserRepository;
use crate::errors::{AppError, AppResult};
use crate::external::{GeoIpResolver, Notifier};
use crate::models::{RequestContext, User};
use crate::oauth::Provider;
use crate::session::{SessionBroker, StateKey};
use crate::tokens::{TokenIssuer, TokenPair};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Full session handed to a fully authenticated user
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: User,
    pub shared_project_ids: Vec<Uuid>,
}

/// Reduced projection for a session still awaiting its second factor
#[derive(Debug, Serialize)]
pub struct TwoFactorChallenge {
    pub is_two_factor_enabled: bool,
    pub email: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Outcome of an authenticate call
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AuthenticateOutcome {
    Session(SessionResponse),
    SecondFactorRequired(TwoFactorChallenge),
}

/// Resolves consumed SSO identities to user accounts
pub struct AccountLinker {
    users: Arc<dyn UserRepository>,
    broker: SessionBroker,
    issuer: Arc<TokenIssuer>,
    notifier: Arc<dyn Notifier>,
    geo: Arc<dyn GeoIpResolver>,
    trial_days: i64,
    login_alert_chat_id: Option<i64>,
}

impl AccountLinker {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        broker: SessionBroker,
        issuer: Arc<TokenIssuer>,
        notifier: Arc<dyn Notifier>,
        geo: Arc<dyn GeoIpResolver>,
        trial_days: i64,
        login_alert_chat_id: Option<i64>,
    ) -> Self {
        Self {
            users,
            broker,
            issuer,
            notifier,
            geo,
            trial_days,
            login_alert_chat_id,
        }
    }

    /// Consume the pending session and log in or provision the user
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` when no session exists for the state key
    /// - `ResourceConflict` on corrupted session data or an external-id
    ///   inconsistency
    pub async fn authenticate(
        &self,
        provider: Provider,
        nonce: &str,
        ctx: &RequestContext,
        ref_code: Option<&str>,
    ) -> AppResult<AuthenticateOutcome> {
        let key = StateKey::new(provider, nonce);
        let identity = self.broker.consume_session(&key).await?;

        let existing = self
            .users
            .find_by_external_id(provider, &identity.external_id)
            .await?;

        let Some(user) = existing else {
            return self.provision(provider, identity.external_id, identity.email, ref_code).await;
        };

        // The lookup was keyed on this id; a mismatch here means the row
        // changed underneath us or the store is inconsistent.
        if user.external_id(provider) != Some(identity.external_id.as_str()) {
            tracing::error!("external id mismatch for user {} on {provider}", user.id);
            return Err(AppError::conflict("Account data inconsistency"));
        }

        self.notify_login(&user, ctx).await;

        if user.is_two_factor_enabled {
            let tokens = self.issuer.issue_pair(user.id, false).await?;
            return Ok(AuthenticateOutcome::SecondFactorRequired(TwoFactorChallenge {
                is_two_factor_enabled: true,
                email: user.email,
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            }));
        }

        let tokens = self.issuer.issue_pair(user.id, true).await?;
        let shared_project_ids = self.users.shared_project_ids(user.id).await?;
        Ok(AuthenticateOutcome::Session(SessionResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user,
            shared_project_ids,
        }))
    }

    /// Create a new account from an SSO identity
    async fn provision(
        &self,
        provider: Provider,
        external_id: String,
        email: String,
        ref_code: Option<&str>,
    ) -> AppResult<AuthenticateOutcome> {
        let mut user = User::provisioned(email, provider, external_id, self.trial_days);
        user.referrer_id = match ref_code {
            Some(code) => self.resolve_referrer(code).await,
            None => None,
        };

        self.users.create(&user).await?;
        tracing::info!("provisioned user {} via {provider}", user.id);

        // SSO already proved email ownership; the session is fully authenticated.
        let tokens = self.issuer.issue_pair(user.id, true).await?;
        Ok(AuthenticateOutcome::Session(SessionResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user,
            shared_project_ids: Vec::new(),
        }))
    }

    /// Attach the identity held by the pending session to an existing user
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` when no session exists or the user is unknown
    /// - `ResourceConflict` when the identity belongs to a different user
    pub async fn link(&self, user_id: Uuid, provider: Provider, nonce: &str) -> AppResult<User> {
        let key = StateKey::new(provider, nonce);
        let identity = self.broker.consume_session(&key).await?;

        if let Some(holder) = self
            .users
            .find_by_external_id(provider, &identity.external_id)
            .await?
        {
            if holder.id != user_id {
                return Err(AppError::conflict(format!(
                    "This {provider} identity is already linked to another account"
                )));
            }
        }

        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        user.set_external_id(provider, Some(identity.external_id));
        self.users.update(&user).await?;
        Ok(user)
    }

    /// Detach a provider identity from an existing user
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` when the user is unknown
    /// - `ResourceConflict` when the account was registered through this
    ///   provider (unlinking would strand it with no login method)
    pub async fn unlink(&self, user_id: Uuid, provider: Provider) -> AppResult<User> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if user.registered_with(provider) {
            return Err(AppError::conflict(format!(
                "Cannot unlink {provider}: the account was registered with it"
            )));
        }

        user.set_external_id(provider, None);
        self.users.update(&user).await?;
        Ok(user)
    }

    /// Resolve a referral code to a referrer id, degrading to none on any failure
    async fn resolve_referrer(&self, code: &str) -> Option<Uuid> {
        match self.users.find_by_referral_code(code).await {
            Ok(Some(referrer)) => Some(referrer.id),
            Ok(None) => {
                tracing::debug!("referral code {code} did not resolve");
                None
            }
            Err(e) => {
                tracing::warn!("referral lookup failed for {code}: {e}");
                None
            }
        }
    }

    /// Best-effort login notification through the messaging collaborator
    async fn notify_login(&self, user: &User, ctx: &RequestContext) {
        let Some(chat_id) = self.login_alert_chat_id else {
            return;
        };

        let location = match ctx.ip.as_deref() {
            Some(ip) => self.geo.locate(ip).await.ok().flatten(),
            None => None,
        };
        let text = match location {
            Some(place) => format!("Login: {} from {place}", user.email),
            None => format!("Login: {}", user.email),
        };

        if let Err(e) = self.notifier.send(chat_id, &text).await {
            tracing::warn!("login notification failed: {e}");
        }
    }
}
