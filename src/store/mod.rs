// ABOUTME: Ephemeral session store abstraction with per-key TTL and atomic take
// ABOUTME: Pluggable backend support following the repository-provider pattern
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Ephemeral Session Store
//!
//! Shared key-value store holding the pending SSO slots. Keys carry a TTL
//! and values are consumed with an atomic read-then-delete: under
//! concurrent consumption of the same key, exactly one caller observes the
//! value and every other observes a miss.

/// In-memory store implementation
pub mod memory;

use crate::errors::AppResult;
use std::time::Duration;

/// Store trait for pluggable ephemeral backends
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Write a value under `key`, replacing any prior value and resetting its TTL
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Atomically read and delete the value under `key`
    ///
    /// Returns `None` when the key is absent, expired, or was already
    /// taken by a concurrent caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails
    async fn take(&self, key: &str) -> AppResult<Option<String>>;
}
