// ABOUTME: Core domain models for the authentication and identity-linking system
// ABOUTME: User, ActionToken, provider identity claims and request context
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data structures shared across the authentication core

pub mod action_token;
pub mod user;

pub use action_token::{ActionToken, ActionTokenKind};
pub use user::User;

use serde::{Deserialize, Serialize};

/// Normalized identity claims produced by a provider adapter
///
/// Both provider protocols (Google token-info, GitHub code exchange) are
/// reduced to this shape before anything downstream sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Stable identifier assigned by the provider (`sub` for Google, numeric id for GitHub)
    pub external_id: String,
    /// Email address attested by the provider
    pub email: String,
}

/// Per-request client context used for login notifications
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}
