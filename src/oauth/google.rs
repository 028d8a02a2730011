// ABOUTME: Google OAuth adapter using the implicit flow and token-info validation
// ABOUTME: Resolves a client-supplied access token to {sub, email} claims
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Google adapter
//!
//! Google uses the implicit flow: the authorization URL requests
//! `response_type=token`, the provider hands the browser an access token in
//! the redirect fragment, and the client forwards that token to us. We never
//! trust it as-is; identity is resolved by validating the token against
//! Google's token-info endpoint and reading `sub`/`email` from the response.

use super::{provider_request_error, OAuthAdapter, Provider};
use crate::config::OAuthCredentials;
use crate::constants::oauth;
use crate::errors::{AppError, AppResult};
use crate::models::ProviderIdentity;
use serde::Deserialize;

/// Google token-info response, fields we read
#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    sub: String,
    email: String,
}

/// Google OAuth adapter
pub struct GoogleAdapter {
    credentials: OAuthCredentials,
    http: reqwest::Client,
}

impl GoogleAdapter {
    #[must_use]
    pub const fn new(credentials: OAuthCredentials, http: reqwest::Client) -> Self {
        Self { credentials, http }
    }
}

#[async_trait::async_trait]
impl OAuthAdapter for GoogleAdapter {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn build_auth_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=token&scope=email&state={}",
            oauth::GOOGLE_AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.redirect_uri),
            urlencoding::encode(state)
        )
    }

    async fn exchange_for_identity(&self, credential: &str) -> AppResult<ProviderIdentity> {
        let response = self
            .http
            .get(oauth::GOOGLE_TOKENINFO_URL)
            .query(&[("access_token", credential)])
            .send()
            .await
            .map_err(|e| provider_request_error(Provider::Google, &e))?;

        if !response.status().is_success() {
            tracing::debug!("google token-info returned {}", response.status());
            return Err(AppError::auth_invalid("Invalid token supplied for google"));
        }

        let info: TokenInfoResponse = response
            .json()
            .await
            .map_err(|e| provider_request_error(Provider::Google, &e))?;

        Ok(ProviderIdentity {
            external_id: info.sub,
            email: info.email,
        })
    }
}
