// ABOUTME: OAuth module organizing provider adapters behind a common contract
// ABOUTME: Normalizes provider-specific protocols into {external_id, email} claims
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # OAuth Provider Adapters
//!
//! Each supported identity provider implements one adapter: build an
//! authorization URL carrying the caller's state, and exchange the
//! credential that comes back (an access token for Google's implicit flow,
//! an authorization code for GitHub) for normalized identity claims.
//! Provider-specific branching happens exactly once, at registry lookup.

pub mod github;
pub mod google;

use crate::errors::{AppError, AppResult};
use crate::models::ProviderIdentity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

pub use github::GitHubAdapter;
pub use google::GoogleAdapter;

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    GitHub,
}

impl Provider {
    /// Convert to string for keys and database storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::GitHub),
            _ => Err(AppError::invalid_input(format!("Unknown provider: {s}"))),
        }
    }
}

/// Trait for OAuth provider adapter implementations
#[async_trait::async_trait]
pub trait OAuthAdapter: Send + Sync {
    /// Which provider this adapter speaks for
    fn provider(&self) -> Provider;

    /// Build the authorization URL the client is redirected to
    fn build_auth_url(&self, state: &str) -> String;

    /// Exchange the provider credential for normalized identity claims
    ///
    /// The credential is what the provider round-trip handed the client:
    /// an access token (Google implicit flow) or an authorization code
    /// (GitHub). Upstream response bodies are never surfaced to callers.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the provider rejects the credential
    /// and an external-service error on transport failure or timeout.
    async fn exchange_for_identity(&self, credential: &str) -> AppResult<ProviderIdentity>;
}

/// Adapter registry keyed by provider tag
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Box<dyn OAuthAdapter>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register an adapter, replacing any prior registration for its provider
    pub fn register(&mut self, adapter: Box<dyn OAuthAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    /// Look up the adapter for a provider
    ///
    /// # Errors
    ///
    /// Returns a validation error if no adapter is registered
    pub fn get(&self, provider: Provider) -> AppResult<&dyn OAuthAdapter> {
        self.adapters
            .get(&provider)
            .map(AsRef::as_ref)
            .ok_or_else(|| AppError::invalid_input(format!("Provider not configured: {provider}")))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a reqwest failure to the error taxonomy
///
/// Transport-level failures (connect, timeout) are retryable external-service
/// errors; everything else means the provider rejected what we sent.
pub(crate) fn provider_request_error(provider: Provider, err: &reqwest::Error) -> AppError {
    if err.is_timeout() || err.is_connect() {
        tracing::warn!("{provider} request failed in transport: {err}");
        AppError::external_service(provider.as_str(), "request failed, retry later")
    } else {
        tracing::debug!("{provider} rejected exchange: {err}");
        AppError::auth_invalid(format!("Invalid token/code supplied for {provider}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip() {
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("github".parse::<Provider>().unwrap(), Provider::GitHub);
        assert!("strava".parse::<Provider>().is_err());
        assert_eq!(Provider::Google.to_string(), "google");
    }
}
