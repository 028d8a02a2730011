// ABOUTME: External collaborator clients and seams (mailer, messaging, geo lookup)
// ABOUTME: Async traits injected into the core; HTTP implementations plus logging fallbacks
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External collaborator interfaces consumed by the authentication core

/// Breach-check client (k-anonymity scheme)
pub mod breach;

use crate::errors::{AppError, AppResult};

/// Outbound mail dispatch
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Send a templated message to one address
    ///
    /// # Errors
    ///
    /// Returns an error if dispatch fails
    async fn send(&self, template: &str, to: &str, vars: serde_json::Value) -> AppResult<()>;
}

/// Messaging notifier (chat channel)
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Post a text message to a chat
    ///
    /// # Errors
    ///
    /// Returns an error if dispatch fails
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()>;
}

/// Geo/IP lookup used to annotate login notifications
#[async_trait::async_trait]
pub trait GeoIpResolver: Send + Sync {
    /// Resolve an IP to a human-readable location, if known
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure
    async fn locate(&self, ip: &str) -> AppResult<Option<String>>;
}

/// Mailer that logs instead of sending; local deployments and tests
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, template: &str, to: &str, vars: serde_json::Value) -> AppResult<()> {
        tracing::info!("mail [{template}] to {to}: {vars}");
        Ok(())
    }
}

/// Notifier that logs instead of posting
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()> {
        tracing::info!("notify chat {chat_id}: {text}");
        Ok(())
    }
}

/// Telegram Bot API notifier
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
}

impl TelegramNotifier {
    #[must_use]
    pub const fn new(http: reqwest::Client, bot_token: String) -> Self {
        Self { http, bot_token }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| AppError::external_service("telegram", e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::external_service(
                "telegram",
                format!("sendMessage returned {}", response.status()),
            ));
        }
        Ok(())
    }
}

/// Geo resolver backed by the ip-api.com JSON endpoint
pub struct IpApiGeoResolver {
    http: reqwest::Client,
}

impl IpApiGeoResolver {
    #[must_use]
    pub const fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[derive(Debug, serde::Deserialize)]
struct IpApiResponse {
    city: Option<String>,
    country: Option<String>,
}

#[async_trait::async_trait]
impl GeoIpResolver for IpApiGeoResolver {
    async fn locate(&self, ip: &str) -> AppResult<Option<String>> {
        let url = format!("http://ip-api.com/json/{ip}?fields=city,country");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::external_service("ip-api", e.to_string()))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_service("ip-api", e.to_string()))?;

        Ok(match (body.city, body.country) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (None, Some(country)) => Some(country),
            _ => None,
        })
    }
}

/// Geo resolver that never resolves; deployments without lookup access
#[derive(Debug, Clone, Default)]
pub struct NoopGeoResolver;

#[async_trait::async_trait]
impl GeoIpResolver for NoopGeoResolver {
    async fn locate(&self, _ip: &str) -> AppResult<Option<String>> {
        Ok(None)
    }
}
