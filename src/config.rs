// ABOUTME: Environment-based configuration management for deployment settings
// ABOUTME: Parses env vars into a strongly typed ServerConfig at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-based configuration management

use crate::constants::{defaults, limits};
use crate::errors::{AppError, AppResult};
use std::env;
use tracing::warn;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse from string with fallback to `Info`
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }

    /// Convert to a `tracing` filter directive
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Credentials for one OAuth identity provider
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Signing secrets and lifetimes for issued tokens
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric key for access-token signing
    pub access_secret: String,
    /// Symmetric key for refresh-token signing, distinct from the access key
    pub refresh_secret: String,
    pub access_expiry_minutes: i64,
    pub refresh_expiry_days: i64,
}

/// Pending-session slot settings
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub max_pending: usize,
}

/// Action-token lifecycle settings
#[derive(Debug, Clone, Copy)]
pub struct ActionTokenConfig {
    pub email_request_cap: u32,
    pub max_age_hours: i64,
}

/// Complete server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub base_url: String,
    pub database_url: String,
    pub log_level: LogLevel,
    pub google: OAuthCredentials,
    pub github: OAuthCredentials,
    pub tokens: TokenConfig,
    pub session: SessionConfig,
    pub action_tokens: ActionTokenConfig,
    pub trial_days: i64,
    pub outbound_timeout_secs: u64,
    /// Chat that receives login notifications, if configured
    pub login_alert_chat_id: Option<i64>,
    pub telegram_bot_token: Option<String>,
}

fn required(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::config(format!("{name} not set")))
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable (provider credentials,
    /// token secrets) is missing.
    pub fn from_env() -> AppResult<Self> {
        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| defaults::BASE_URL.to_owned());

        let google = OAuthCredentials {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| format!("{base_url}/auth/google/callback")),
        };
        let github = OAuthCredentials {
            client_id: required("GITHUB_CLIENT_ID")?,
            client_secret: required("GITHUB_CLIENT_SECRET")?,
            redirect_uri: env::var("GITHUB_REDIRECT_URI")
                .unwrap_or_else(|_| format!("{base_url}/auth/github/callback")),
        };

        let tokens = TokenConfig {
            access_secret: required("JWT_ACCESS_SECRET")?,
            refresh_secret: required("JWT_REFRESH_SECRET")?,
            access_expiry_minutes: parsed_or(
                "ACCESS_TOKEN_EXPIRY_MINUTES",
                limits::ACCESS_TOKEN_EXPIRY_MINUTES,
            ),
            refresh_expiry_days: parsed_or(
                "REFRESH_TOKEN_EXPIRY_DAYS",
                limits::REFRESH_TOKEN_EXPIRY_DAYS,
            ),
        };
        if tokens.access_secret == tokens.refresh_secret {
            warn!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET are identical");
        }

        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN").ok();
        let login_alert_chat_id = env::var("LOGIN_ALERT_CHAT_ID")
            .ok()
            .and_then(|v| v.parse().ok());

        Ok(Self {
            http_port: parsed_or("HTTP_PORT", defaults::HTTP_PORT),
            base_url,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_owned()),
            log_level: LogLevel::from_str_or_default(
                &env::var("LOG_LEVEL").unwrap_or_default(),
            ),
            google,
            github,
            tokens,
            session: SessionConfig {
                ttl_secs: parsed_or("PENDING_SESSION_TTL_SECS", limits::PENDING_SESSION_TTL_SECS),
                max_pending: parsed_or("MAX_PENDING_SESSIONS", limits::MAX_PENDING_SESSIONS),
            },
            action_tokens: ActionTokenConfig {
                email_request_cap: parsed_or("EMAIL_REQUEST_CAP", limits::EMAIL_REQUEST_CAP),
                max_age_hours: parsed_or(
                    "ACTION_TOKEN_MAX_AGE_HOURS",
                    limits::ACTION_TOKEN_MAX_AGE_HOURS,
                ),
            },
            trial_days: parsed_or("TRIAL_PERIOD_DAYS", limits::TRIAL_PERIOD_DAYS),
            outbound_timeout_secs: parsed_or(
                "OUTBOUND_HTTP_TIMEOUT_SECS",
                limits::OUTBOUND_HTTP_TIMEOUT_SECS,
            ),
            login_alert_chat_id,
            telegram_bot_token,
        })
    }
}
