// ABOUTME: Action token service - single-use mailed tokens for account changes
// ABOUTME: Verification, password reset and email change with send throttling
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Action Token Service
//!
//! Issues and consumes single-use, purpose-scoped tokens for the mailed
//! account flows. A kind mismatch on confirmation is reported exactly like
//! an unknown token; the caller never learns which check failed. Tokens
//! expire a configured number of hours after creation and are removed
//! lazily on lookup.

use crate::config::ActionTokenConfig;
use crate::database::{ActionTokenRepository, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::external::breach::BreachCheck;
use crate::external::Mailer;
use crate::models::{ActionToken, ActionTokenKind, User};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 8;

/// Single-use token issuance and consumption
pub struct ActionTokenService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn ActionTokenRepository>,
    mailer: Arc<dyn Mailer>,
    breach: Arc<dyn BreachCheck>,
    config: ActionTokenConfig,
    base_url: String,
}

impl ActionTokenService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn ActionTokenRepository>,
        mailer: Arc<dyn Mailer>,
        breach: Arc<dyn BreachCheck>,
        config: ActionTokenConfig,
        base_url: String,
    ) -> Self {
        Self {
            users,
            tokens,
            mailer,
            breach,
            config,
            base_url,
        }
    }

    /// Issue and persist a token for `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the repository write fails
    pub async fn create(
        &self,
        user_id: Uuid,
        kind: ActionTokenKind,
        new_value: Option<String>,
    ) -> AppResult<ActionToken> {
        let token = ActionToken::new(user_id, kind, new_value);
        self.tokens.insert(&token).await?;
        Ok(token)
    }

    /// Look up a token, removing it lazily if its lifetime has elapsed
    ///
    /// # Errors
    ///
    /// Returns an error if the repository query fails
    pub async fn find(&self, token_id: &str) -> AppResult<Option<ActionToken>> {
        let Some(token) = self.tokens.find(token_id).await? else {
            return Ok(None);
        };
        if token.is_expired(self.config.max_age_hours) {
            self.tokens.delete(&token.id).await?;
            return Ok(None);
        }
        Ok(Some(token))
    }

    /// Load a live token of the expected kind together with its user
    ///
    /// A mismatched kind, an expired token and an unknown id are all
    /// reported as the same not-found error.
    async fn confirm(
        &self,
        token_id: &str,
        expected_kind: ActionTokenKind,
    ) -> AppResult<(ActionToken, User)> {
        let token = self
            .find(token_id)
            .await?
            .filter(|t| t.kind == expected_kind)
            .ok_or_else(|| AppError::not_found("Action token"))?;

        let user = self
            .users
            .find_by_id(token.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Action token"))?;

        Ok((token, user))
    }

    /// Send a verification email, counting it against the user's cap
    ///
    /// # Errors
    ///
    /// - `ResourceConflict` when the account is already verified or the
    ///   send cap is reached (the counter does not advance past the cap)
    pub async fn request_verification(&self, user_id: Uuid) -> AppResult<()> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if user.is_active {
            return Err(AppError::conflict("Email is already verified"));
        }
        if user.email_requests >= self.config.email_request_cap {
            return Err(AppError::conflict("Verification email limit reached"));
        }

        let token = self
            .create(user.id, ActionTokenKind::EmailVerification, None)
            .await?;
        self.mailer
            .send(
                "email-verification",
                &user.email,
                json!({ "link": format!("{}/auth/verification/confirm?token={}", self.base_url, token.id) }),
            )
            .await?;

        user.email_requests += 1;
        self.users.update(&user).await
    }

    /// Consume a verification token: activate the account
    ///
    /// # Errors
    ///
    /// Returns not-found for unknown, expired or wrong-kind tokens
    pub async fn confirm_verification(&self, token_id: &str) -> AppResult<()> {
        let (token, mut user) = self.confirm(token_id, ActionTokenKind::EmailVerification).await?;

        user.is_active = true;
        // Successful verification releases the send throttle.
        user.email_requests = 0;
        self.users.update(&user).await?;
        self.tokens.delete(&token.id).await
    }

    /// Mail a password-reset token
    ///
    /// An unknown email is reported as success so the endpoint cannot be
    /// used to enumerate accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if token persistence or the send fails
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = self.create(user.id, ActionTokenKind::PasswordReset, None).await?;
        self.mailer
            .send(
                "password-reset",
                &user.email,
                json!({ "link": format!("{}/auth/password-reset/confirm?token={}", self.base_url, token.id) }),
            )
            .await
    }

    /// Consume a reset token: replace the password and revoke every refresh token
    ///
    /// The candidate password is screened against the breach corpus first;
    /// a breached password is refused and the token stays valid.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for weak or breached passwords
    /// - `ResourceNotFound` for unknown, expired or wrong-kind tokens
    /// - `ExternalServiceError` when the breach check cannot be reached
    pub async fn confirm_password_reset(&self, token_id: &str, new_password: &str) -> AppResult<()> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::invalid_input("Password is too short"));
        }

        let (token, mut user) = self.confirm(token_id, ActionTokenKind::PasswordReset).await?;

        if self.breach.is_breached(new_password).await? {
            return Err(AppError::invalid_input(
                "Password appears in known data breaches, choose another",
            ));
        }

        let password = new_password.to_owned();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        user.password_hash = Some(hash);
        self.users.update(&user).await?;

        // Forces re-login everywhere with the new credential.
        self.users.clear_refresh_tokens(user.id).await?;
        self.tokens.delete(&token.id).await
    }

    /// Mail an email-change token to the proposed new address
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed address
    /// - `ResourceAlreadyExists` when the address is already taken
    pub async fn request_email_change(&self, user_id: Uuid, new_email: &str) -> AppResult<()> {
        if !is_valid_email(new_email) {
            return Err(AppError::invalid_input("Invalid email address"));
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if self.users.find_by_email(new_email).await?.is_some() {
            return Err(AppError::already_exists("Email already in use"));
        }

        let token = self
            .create(user.id, ActionTokenKind::EmailChange, Some(new_email.to_owned()))
            .await?;
        self.mailer
            .send(
                "email-change",
                new_email,
                json!({ "link": format!("{}/auth/email-change/confirm?token={}", self.base_url, token.id) }),
            )
            .await
    }

    /// Consume an email-change token: swap the address and notify both sides
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` for unknown, expired or wrong-kind tokens
    /// - `ResourceAlreadyExists` when the address was taken meanwhile
    pub async fn confirm_email_change(&self, token_id: &str) -> AppResult<()> {
        let (token, mut user) = self.confirm(token_id, ActionTokenKind::EmailChange).await?;

        let new_email = token
            .new_value
            .clone()
            .ok_or_else(|| AppError::internal("Email-change token holds no new address"))?;

        if self.users.find_by_email(&new_email).await?.is_some() {
            return Err(AppError::already_exists("Email already in use"));
        }

        let old_email = std::mem::replace(&mut user.email, new_email.clone());
        self.users.update(&user).await?;
        self.tokens.delete(&token.id).await?;

        for (address, vars) in [
            (&old_email, json!({ "new_email": new_email })),
            (&new_email, json!({ "old_email": old_email })),
        ] {
            if let Err(e) = self.mailer.send("email-changed", address, vars).await {
                tracing::warn!("email-change notification to {address} failed: {e}");
            }
        }
        Ok(())
    }
}

/// Minimal structural email check
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
