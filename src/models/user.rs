// ABOUTME: User model for the identity-linking core
// ABOUTME: Tracks linked provider identities, trial window and verification state
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oauth::Provider;

/// A user account
///
/// Accounts are created either by password registration (outside this core)
/// or provisioned on first SSO login. At most one account may hold a given
/// external provider id; the origin-registration flags record which login
/// method created the account and therefore must never be unlinked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// User email address
    pub email: String,
    /// Hashed password, absent for SSO-only accounts
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Google subject id, if linked
    pub google_id: Option<String>,
    /// GitHub account id, if linked
    pub github_id: Option<String>,
    /// Account was originally registered through Google SSO
    pub registered_with_google: bool,
    /// Account was originally registered through GitHub SSO
    pub registered_with_github: bool,
    /// Code other users supply to attribute their registration to this account
    pub referral_code: String,
    /// Account that referred this user, if any
    pub referrer_id: Option<Uuid>,
    /// End of the free trial window
    pub trial_end_date: DateTime<Utc>,
    /// Whether the email address has been verified
    pub is_active: bool,
    /// Whether a second factor is required to complete login
    pub is_two_factor_enabled: bool,
    /// Verification emails sent so far; sends are refused at the cap
    pub email_requests: u32,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create an account provisioned from an SSO identity
    ///
    /// SSO providers attest email ownership, so provisioned accounts start
    /// verified (`is_active = true`).
    #[must_use]
    pub fn provisioned(
        email: String,
        provider: Provider,
        external_id: String,
        trial_days: i64,
    ) -> Self {
        let now = Utc::now();
        let mut user = Self {
            id: Uuid::new_v4(),
            email,
            password_hash: None,
            google_id: None,
            github_id: None,
            registered_with_google: provider == Provider::Google,
            registered_with_github: provider == Provider::GitHub,
            referral_code: generate_referral_code(),
            referrer_id: None,
            trial_end_date: now + Duration::days(trial_days),
            is_active: true,
            is_two_factor_enabled: false,
            email_requests: 0,
            created_at: now,
        };
        user.set_external_id(provider, Some(external_id));
        user
    }

    /// Get the linked external id for a provider
    #[must_use]
    pub fn external_id(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.google_id.as_deref(),
            Provider::GitHub => self.github_id.as_deref(),
        }
    }

    /// Set or clear the linked external id for a provider
    pub fn set_external_id(&mut self, provider: Provider, external_id: Option<String>) {
        match provider {
            Provider::Google => self.google_id = external_id,
            Provider::GitHub => self.github_id = external_id,
        }
    }

    /// Whether the account was originally registered through this provider
    #[must_use]
    pub const fn registered_with(&self, provider: Provider) -> bool {
        match provider {
            Provider::Google => self.registered_with_google,
            Provider::GitHub => self.registered_with_github,
        }
    }
}

/// Generate a short referral code
fn generate_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioned_user_starts_verified() {
        let user = User::provisioned(
            "a@example.com".into(),
            Provider::GitHub,
            "12345".into(),
            14,
        );
        assert!(user.is_active);
        assert!(user.registered_with_github);
        assert!(!user.registered_with_google);
        assert_eq!(user.external_id(Provider::GitHub), Some("12345"));
        assert!(user.external_id(Provider::Google).is_none());
        assert!(user.trial_end_date > Utc::now());
    }

    #[test]
    fn test_referral_codes_are_distinct() {
        let a = generate_referral_code();
        let b = generate_referral_code();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }
}
