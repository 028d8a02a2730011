// ABOUTME: Session exchange broker bridging the two browser contexts of an SSO round-trip
// ABOUTME: Pending slot lifecycle - create empty, write claims once, consume exactly once
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Session Exchange Broker
//!
//! The browser performing the OAuth redirect and the tab awaiting the
//! result are different execution contexts; the unguessable state nonce is
//! the sole correlation key between them and doubles as CSRF protection.
//! The broker owns the pending slot's lifecycle: created empty when the
//! auth URL is requested, written once by the provider exchange, consumed
//! exactly once by authenticate, or expired unused by the store's TTL.

use crate::errors::{AppError, AppResult};
use crate::models::ProviderIdentity;
use crate::oauth::Provider;
use crate::store::SessionStore;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Typed slot key, `provider:nonce` on the wire
///
/// Parsed once at the boundary; the string form exists only at the store
/// serialization edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateKey {
    pub provider: Provider,
    pub nonce: String,
}

impl StateKey {
    /// Mint a key with a fresh random nonce
    #[must_use]
    pub fn generate(provider: Provider) -> Self {
        Self {
            provider,
            nonce: Uuid::new_v4().to_string(),
        }
    }

    #[must_use]
    pub fn new(provider: Provider, nonce: impl Into<String>) -> Self {
        Self {
            provider,
            nonce: nonce.into(),
        }
    }
}

impl Display for StateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.provider, self.nonce)
    }
}

impl FromStr for StateKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, nonce) = s
            .split_once(':')
            .ok_or_else(|| AppError::invalid_input(format!("Malformed state key: {s}")))?;
        if nonce.is_empty() {
            return Err(AppError::invalid_input(format!("Malformed state key: {s}")));
        }
        Ok(Self {
            provider: provider.parse()?,
            nonce: nonce.to_owned(),
        })
    }
}

/// Broker over the ephemeral store for pending SSO sessions
#[derive(Clone)]
pub struct SessionBroker {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionBroker {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// TTL applied to pending slots, surfaced in the auth-URL response
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create (or reset) an empty pending slot under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails
    pub async fn create_pending_session(&self, key: &StateKey) -> AppResult<()> {
        self.store.put(&key.to_string(), "", self.ttl).await
    }

    /// Write identity claims into the slot, refreshing its TTL
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails
    pub async fn write_session_result(
        &self,
        key: &StateKey,
        identity: &ProviderIdentity,
    ) -> AppResult<()> {
        let serialized = serde_json::to_string(identity)
            .map_err(|e| AppError::internal(format!("Failed to serialize session claims: {e}")))?;
        self.store.put(&key.to_string(), &serialized, self.ttl).await
    }

    /// Atomically consume the slot and return the claims written into it
    ///
    /// Exactly one concurrent caller can succeed for a given key; every
    /// other observes not-found, as does any caller after TTL expiry. A
    /// slot consumed before the provider round-trip completed (still
    /// empty) also reads as not-found.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` when the slot is absent, expired, already
    ///   consumed, or empty
    /// - `ResourceConflict` when the slot holds undeserializable data
    pub async fn consume_session(&self, key: &StateKey) -> AppResult<ProviderIdentity> {
        let value = self
            .store
            .take(&key.to_string())
            .await?
            .ok_or_else(|| AppError::not_found("Pending session"))?;

        if value.is_empty() {
            return Err(AppError::not_found("Pending session"));
        }

        serde_json::from_str(&value).map_err(|e| {
            tracing::error!("pending session {key} held corrupted claims: {e}");
            AppError::conflict("Corrupted session data")
        })
    }
}
