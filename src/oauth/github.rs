// ABOUTME: GitHub OAuth adapter using the authorization-code flow
// ABOUTME: Falls back to the email list and primary-flag selection when the profile omits email
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # GitHub adapter
//!
//! GitHub uses the authorization-code flow: the code coming back on the
//! redirect is exchanged for an access token, the token fetches the user
//! profile, and when the profile carries no public email the account's
//! email list is consulted and the entry flagged primary is selected.

use super::{provider_request_error, OAuthAdapter, Provider};
use crate::config::OAuthCredentials;
use crate::constants::{oauth, service};
use crate::errors::{AppError, AppResult};
use crate::models::ProviderIdentity;
use serde::Deserialize;

/// GitHub code-for-token response
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
}

/// GitHub user profile, fields we read
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    email: Option<String>,
}

/// GitHub email list entry
#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
}

/// GitHub OAuth adapter
pub struct GitHubAdapter {
    credentials: OAuthCredentials,
    http: reqwest::Client,
}

impl GitHubAdapter {
    #[must_use]
    pub const fn new(credentials: OAuthCredentials, http: reqwest::Client) -> Self {
        Self { credentials, http }
    }

    /// Exchange the authorization code for a bearer token
    async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
        ];

        let response = self
            .http
            .post(oauth::GITHUB_TOKEN_URL)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| provider_request_error(Provider::GitHub, &e))?;

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| provider_request_error(Provider::GitHub, &e))?;

        // GitHub reports a rejected code as 200 with an error body
        token
            .access_token
            .ok_or_else(|| AppError::auth_invalid("Invalid code supplied for github"))
    }

    async fn fetch_user(&self, access_token: &str) -> AppResult<GitHubUser> {
        self.http
            .get(oauth::GITHUB_USER_URL)
            .header("Authorization", format!("Bearer {access_token}"))
            .header("User-Agent", service::USER_AGENT)
            .send()
            .await
            .map_err(|e| provider_request_error(Provider::GitHub, &e))?
            .json()
            .await
            .map_err(|e| provider_request_error(Provider::GitHub, &e))
    }

    async fn fetch_primary_email(&self, access_token: &str) -> AppResult<String> {
        let emails: Vec<GitHubEmail> = self
            .http
            .get(oauth::GITHUB_EMAILS_URL)
            .header("Authorization", format!("Bearer {access_token}"))
            .header("User-Agent", service::USER_AGENT)
            .send()
            .await
            .map_err(|e| provider_request_error(Provider::GitHub, &e))?
            .json()
            .await
            .map_err(|e| provider_request_error(Provider::GitHub, &e))?;

        select_primary_email(emails)
            .ok_or_else(|| AppError::auth_invalid("GitHub account has no primary email"))
    }
}

/// Pick the address flagged primary from the account's email list
fn select_primary_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails.into_iter().find(|e| e.primary).map(|e| e.email)
}

#[async_trait::async_trait]
impl OAuthAdapter for GitHubAdapter {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    fn build_auth_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            oauth::GITHUB_AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.redirect_uri),
            urlencoding::encode("user:email"),
            urlencoding::encode(state)
        )
    }

    async fn exchange_for_identity(&self, credential: &str) -> AppResult<ProviderIdentity> {
        let access_token = self.exchange_code(credential).await?;
        let user = self.fetch_user(&access_token).await?;

        let email = match user.email {
            Some(email) => email,
            None => self.fetch_primary_email(&access_token).await?,
        };

        Ok(ProviderIdentity {
            external_id: user.id.to_string(),
            email,
        })
    }
}
