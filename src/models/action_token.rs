// ABOUTME: Single-use action token model for mailed account-change flows
// ABOUTME: Purpose-scoped tokens for email verification, password reset and email change
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::AppError;

/// Purpose a single-use token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTokenKind {
    EmailVerification,
    PasswordReset,
    EmailChange,
}

impl ActionTokenKind {
    /// Convert to string for database storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
            Self::EmailChange => "email_change",
        }
    }
}

impl Display for ActionTokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionTokenKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(Self::EmailVerification),
            "password_reset" => Ok(Self::PasswordReset),
            "email_change" => Ok(Self::EmailChange),
            _ => Err(AppError::invalid_input(format!("Invalid action token kind: {s}"))),
        }
    }
}

/// A single-use, purpose-scoped token mailed to a user
///
/// Deleted the instant it is consumed. Never reveals on lookup whether the
/// id was unknown or the kind mismatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionToken {
    /// Opaque unguessable identifier
    pub id: String,
    /// Owning user
    pub user_id: Uuid,
    /// Purpose this token authorizes
    pub kind: ActionTokenKind,
    /// Pending value for `EmailChange` (the new address)
    pub new_value: Option<String>,
    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl ActionToken {
    /// Create a token with a freshly generated unguessable id
    #[must_use]
    pub fn new(user_id: Uuid, kind: ActionTokenKind, new_value: Option<String>) -> Self {
        Self {
            id: generate_token_id(),
            user_id,
            kind,
            new_value,
            created_at: Utc::now(),
        }
    }

    /// Whether the token has outlived the configured maximum age
    #[must_use]
    pub fn is_expired(&self, max_age_hours: i64) -> bool {
        Utc::now() - self.created_at > Duration::hours(max_age_hours)
    }
}

/// Generate an opaque 256-bit token id, hex encoded
fn generate_token_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
