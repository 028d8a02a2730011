// ABOUTME: Application constants and default configuration values
// ABOUTME: Limits, default TTLs and provider endpoint URLs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application constants and configuration defaults

/// Limits enforced by the authentication core
pub mod limits {
    /// TTL for a pending SSO session slot, in seconds
    pub const PENDING_SESSION_TTL_SECS: u64 = 300;

    /// Maximum number of pending SSO sessions held in memory
    pub const MAX_PENDING_SESSIONS: usize = 10_000;

    /// Maximum verification emails a user may request before sends are refused
    pub const EMAIL_REQUEST_CAP: u32 = 3;

    /// Access token lifetime in minutes
    pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 30;

    /// Refresh token lifetime in days
    pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

    /// Action token lifetime in hours
    pub const ACTION_TOKEN_MAX_AGE_HOURS: i64 = 24;

    /// Trial window granted to newly provisioned accounts, in days
    pub const TRIAL_PERIOD_DAYS: i64 = 14;

    /// Timeout for outbound provider and breach-check calls, in seconds
    pub const OUTBOUND_HTTP_TIMEOUT_SECS: u64 = 10;
}

/// Default server settings
pub mod defaults {
    /// Default HTTP port
    pub const HTTP_PORT: u16 = 8081;

    /// Default public base URL used in auth redirects and mailed links
    pub const BASE_URL: &str = "http://localhost:8081";

    /// Default `SQLite` database URL
    pub const DATABASE_URL: &str = "sqlite:gatehouse.db?mode=rwc";
}

/// Identity-provider endpoint URLs
pub mod oauth {
    /// Google implicit-flow authorization endpoint
    pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// Google token-info endpoint for access-token validation
    pub const GOOGLE_TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";

    /// GitHub authorization-code endpoint
    pub const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";

    /// GitHub code-for-token exchange endpoint
    pub const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

    /// GitHub user profile endpoint
    pub const GITHUB_USER_URL: &str = "https://api.github.com/user";

    /// GitHub account email list endpoint
    pub const GITHUB_EMAILS_URL: &str = "https://api.github.com/user/emails";
}

/// External collaborator endpoints
pub mod external {
    /// Pwned Passwords range API base (k-anonymity breach check)
    pub const PWNED_RANGE_URL: &str = "https://api.pwnedpasswords.com/range";

    /// Length of the hash prefix sent to the breach-check service
    pub const PWNED_PREFIX_LEN: usize = 5;
}

/// Service identity strings
pub mod service {
    /// User-Agent sent on outbound provider calls
    pub const USER_AGENT: &str = "gatehouse-server";
}
