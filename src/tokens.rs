// ABOUTME: JWT-based token issuance and the revocable refresh-token set
// ABOUTME: Access tokens are stateless; refresh tokens are persisted and individually revocable
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Token Issuer
//!
//! Mints HS256-signed access and refresh tokens. Access tokens are
//! short-lived and validated statelessly; refresh tokens are additionally
//! members of a persisted per-user set, so any one of them (or all at
//! once) can be revoked.
//!
//! A session that has not completed its second factor never receives a
//! refresh token: it is limited to a single short-lived access token and
//! must re-authenticate rather than silently escalate.

use crate::config::TokenConfig;
use crate::database::UserRepository;
use crate::errors::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    /// Issued at (milliseconds, uniquified per issuer instance)
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Whether the session completed its second factor
    pub is_second_factor_authenticated: bool,
}

/// Claims carried by a refresh token
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Access/refresh pair handed to a session
///
/// `refresh_token` is `None` for sessions still awaiting a second factor.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Token issuance and validation manager
pub struct TokenIssuer {
    users: Arc<dyn UserRepository>,
    config: TokenConfig,
    /// Monotonic counter to ensure unique issued-at times
    token_counter: AtomicU64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, config: TokenConfig) -> Self {
        Self {
            users,
            config,
            token_counter: AtomicU64::new(0),
        }
    }

    fn unique_iat(&self) -> i64 {
        let counter = self.token_counter.fetch_add(1, Ordering::Relaxed);
        Utc::now().timestamp() * 1000 + i64::from(u32::try_from(counter % 1000).unwrap_or(0))
    }

    /// Mint a short-lived stateless access token
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        second_factor_verified: bool,
    ) -> AppResult<String> {
        let expiry = Utc::now() + Duration::minutes(self.config.access_expiry_minutes);
        let claims = AccessClaims {
            sub: user_id.to_string(),
            iat: self.unique_iat(),
            exp: expiry.timestamp(),
            is_second_factor_authenticated: second_factor_verified,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.access_secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))
    }

    /// Mint and persist a refresh token, or return `None` for a partial session
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the repository write fails
    pub async fn issue_refresh_token(
        &self,
        user_id: Uuid,
        second_factor_verified: bool,
    ) -> AppResult<Option<String>> {
        if !second_factor_verified {
            return Ok(None);
        }

        let expiry = Utc::now() + Duration::days(self.config.refresh_expiry_days);
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            iat: self.unique_iat(),
            exp: expiry.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.refresh_secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("Failed to encode refresh token: {e}")))?;

        self.users.add_refresh_token(user_id, &token).await?;
        Ok(Some(token))
    }

    /// Mint the access/refresh pair for a session
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or persistence fails
    pub async fn issue_pair(
        &self,
        user_id: Uuid,
        second_factor_verified: bool,
    ) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user_id, second_factor_verified)?,
            refresh_token: self
                .issue_refresh_token(user_id, second_factor_verified)
                .await?,
        })
    }

    /// Validate an access token and return its claims
    ///
    /// # Errors
    ///
    /// - `AuthExpired` when the token's lifetime has elapsed
    /// - `AuthInvalid` for bad signatures or malformed tokens
    pub fn validate_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.access_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(crate::errors::ErrorCode::AuthExpired, "Access token expired")
            }
            _ => AppError::auth_invalid("Invalid access token"),
        })
    }

    /// Membership test against the user's persisted refresh-token set
    ///
    /// An unparseable or foreign-signed token is simply not a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository query fails
    pub async fn validate_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<bool> {
        let validation = Validation::new(Algorithm::HS256);
        let decoded = decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.config.refresh_secret.as_bytes()),
            &validation,
        );
        let Ok(data) = decoded else {
            return Ok(false);
        };
        if data.claims.sub != user_id.to_string() {
            return Ok(false);
        }

        self.users.refresh_token_exists(user_id, token).await
    }

    /// Remove one refresh token from the user's set
    ///
    /// # Errors
    ///
    /// Returns an error if the repository write fails
    pub async fn revoke(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        self.users.remove_refresh_token(user_id, token).await
    }

    /// Remove every refresh token the user holds
    ///
    /// Invoked after password reset and on explicit "log out everywhere".
    ///
    /// # Errors
    ///
    /// Returns an error if the repository write fails
    pub async fn revoke_all(&self, user_id: Uuid) -> AppResult<()> {
        self.users.clear_refresh_tokens(user_id).await
    }
}
