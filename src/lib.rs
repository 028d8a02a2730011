// ABOUTME: Main library entry point for the Gatehouse authentication core
// ABOUTME: SSO exchange, signed-token issuance and single-use action-token flows
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Gatehouse
//!
//! Authentication and identity-linking core: third-party single-sign-on
//! exchange, signed-token issuance, and single-use action-token flows
//! (email verification, password reset, email change).
//!
//! ## Architecture
//!
//! - **Store**: ephemeral pending-session slots with TTL and atomic take
//! - **OAuth**: provider adapters normalizing Google and GitHub into
//!   `{external_id, email}` claims
//! - **Session**: the broker bridging the two browser contexts of an SSO
//!   round-trip through a single-use slot
//! - **Tokens**: stateless access tokens plus a persisted, revocable
//!   refresh-token set per user
//! - **Account**: provision/login/link/unlink with referral attribution
//! - **Actions**: mailed single-use tokens with send throttling
//!
//! Cross-request state lives behind injected repository traits, so the
//! core runs unchanged against `SQLite` or the in-memory fakes.

/// Account linker resolving SSO identities to users
pub mod account;

/// Single-use action-token flows
pub mod actions;

/// Environment-based configuration management
pub mod config;

/// Application constants and configuration defaults
pub mod constants;

/// Repository abstractions over the durable stores
pub mod database;

/// Unified error handling with standard codes and HTTP responses
pub mod errors;

/// External collaborator clients (mailer, messaging, geo, breach check)
pub mod external;

/// Core domain models
pub mod models;

/// OAuth provider adapters and registry
pub mod oauth;

/// HTTP routes
pub mod routes;

/// Session exchange broker for pending SSO slots
pub mod session;

/// Ephemeral session store abstraction
pub mod store;

/// Token issuance and the revocable refresh-token set
pub mod tokens;
