// ABOUTME: Password breach check against the Pwned Passwords range API
// ABOUTME: k-anonymity - only a 5-char hash prefix leaves the process
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Breach Check
//!
//! Verifies a candidate password against a breach corpus without
//! transmitting it: the password is hashed locally, only the first
//! [`PWNED_PREFIX_LEN`](crate::constants::external::PWNED_PREFIX_LEN) hex
//! characters are sent, and the returned candidate suffixes are scanned
//! locally for the remainder of the hash.

use crate::constants::external::{PWNED_PREFIX_LEN, PWNED_RANGE_URL};
use crate::errors::{AppError, AppResult};
use sha1::{Digest, Sha1};

/// Breach-corpus membership test
#[async_trait::async_trait]
pub trait BreachCheck: Send + Sync {
    /// Whether the password appears in the breach corpus
    ///
    /// # Errors
    ///
    /// Returns a retryable external-service error on transport failure or
    /// timeout; the check never fails open silently.
    async fn is_breached(&self, password: &str) -> AppResult<bool>;
}

/// Client for the Pwned Passwords range API
pub struct PwnedPasswordsClient {
    http: reqwest::Client,
    base_url: String,
}

impl PwnedPasswordsClient {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: PWNED_RANGE_URL.to_owned(),
        }
    }

    /// Point the client at a different range endpoint
    #[must_use]
    pub fn with_base_url(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait::async_trait]
impl BreachCheck for PwnedPasswordsClient {
    async fn is_breached(&self, password: &str) -> AppResult<bool> {
        let digest = sha1_upper_hex(password);
        let (prefix, suffix) = digest.split_at(PWNED_PREFIX_LEN);

        let url = format!("{}/{prefix}", self.base_url);
        let response = self.http.get(&url).send().await.map_err(|e| {
            tracing::warn!("breach check transport failure: {e}");
            AppError::external_service("breach-check", "request failed, retry later")
        })?;

        if !response.status().is_success() {
            return Err(AppError::external_service(
                "breach-check",
                format!("range query returned {}", response.status()),
            ));
        }

        let body = response.text().await.map_err(|e| {
            tracing::warn!("breach check read failure: {e}");
            AppError::external_service("breach-check", "request failed, retry later")
        })?;

        Ok(suffix_in_range_body(&body, suffix))
    }
}

/// Breach check that reports every password clean; tests and air-gapped deployments
#[derive(Debug, Clone, Default)]
pub struct NoopBreachCheck;

#[async_trait::async_trait]
impl BreachCheck for NoopBreachCheck {
    async fn is_breached(&self, _password: &str) -> AppResult<bool> {
        Ok(false)
    }
}

/// Uppercase hex SHA-1 of the password
fn sha1_upper_hex(password: &str) -> String {
    let digest = Sha1::digest(password.as_bytes());
    hex::encode_upper(digest)
}

/// Scan a range response (`SUFFIX:COUNT` lines) for our hash suffix
fn suffix_in_range_body(body: &str, suffix: &str) -> bool {
    body.lines()
        .filter_map(|line| line.split(':').next())
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(suffix))
}
