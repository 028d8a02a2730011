// ABOUTME: Shared test fixtures for integration suites
// ABOUTME: In-memory repositories, recording collaborators and service builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use gatehouse::account::AccountLinker;
use gatehouse::actions::ActionTokenService;
use gatehouse::config::{ActionTokenConfig, TokenConfig};
use gatehouse::database::memory::{InMemoryActionTokenRepository, InMemoryUserRepository};
use gatehouse::errors::AppResult;
use gatehouse::external::breach::BreachCheck;
use gatehouse::external::{Mailer, NoopGeoResolver, Notifier};
use gatehouse::models::User;
use gatehouse::oauth::Provider;
use gatehouse::session::SessionBroker;
use gatehouse::store::memory::InMemorySessionStore;
use gatehouse::tokens::TokenIssuer;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn token_config() -> TokenConfig {
    TokenConfig {
        access_secret: "test-access-secret".into(),
        refresh_secret: "test-refresh-secret".into(),
        access_expiry_minutes: 30,
        refresh_expiry_days: 30,
    }
}

pub fn action_config() -> ActionTokenConfig {
    ActionTokenConfig {
        email_request_cap: 3,
        max_age_hours: 24,
    }
}

pub fn broker() -> SessionBroker {
    broker_with_ttl(Duration::from_secs(300))
}

pub fn broker_with_ttl(ttl: Duration) -> SessionBroker {
    SessionBroker::new(Arc::new(InMemorySessionStore::new(128)), ttl)
}

/// A user registered by password (no linked SSO identity)
pub fn password_user(email: &str) -> User {
    let mut user = User::provisioned(email.into(), Provider::Google, String::new(), 14);
    user.google_id = None;
    user.registered_with_google = false;
    user.password_hash = Some("$2b$12$placeholderplaceholderplaceholder".into());
    user.is_active = false;
    user
}

/// A user originally registered through `provider`
pub fn sso_user(email: &str, provider: Provider, external_id: &str) -> User {
    User::provisioned(email.into(), provider, external_id.into(), 14)
}

/// Mailer that records every send
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sends: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, template: &str, to: &str, _vars: serde_json::Value) -> AppResult<()> {
        self.sends
            .lock()
            .unwrap()
            .push((template.to_owned(), to.to_owned()));
        Ok(())
    }
}

/// Notifier that records every message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<(i64, String)>>>,
}

impl RecordingNotifier {
    pub fn received(&self) -> Vec<(i64, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> AppResult<()> {
        self.messages
            .lock()
            .unwrap()
            .push((chat_id, text.to_owned()));
        Ok(())
    }
}

/// Breach check backed by a fixed set of known-bad passwords
#[derive(Clone, Default)]
pub struct StaticBreachCheck {
    breached: HashSet<String>,
}

impl StaticBreachCheck {
    pub fn with(passwords: &[&str]) -> Self {
        Self {
            breached: passwords.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

#[async_trait::async_trait]
impl BreachCheck for StaticBreachCheck {
    async fn is_breached(&self, password: &str) -> AppResult<bool> {
        Ok(self.breached.contains(password))
    }
}

pub struct LinkerHarness {
    pub users: Arc<InMemoryUserRepository>,
    pub broker: SessionBroker,
    pub issuer: Arc<TokenIssuer>,
    pub notifier: RecordingNotifier,
    pub linker: AccountLinker,
}

pub fn linker_harness(login_alert_chat_id: Option<i64>) -> LinkerHarness {
    let users = Arc::new(InMemoryUserRepository::new());
    let broker = broker();
    let issuer = Arc::new(TokenIssuer::new(users.clone(), token_config()));
    let notifier = RecordingNotifier::default();

    let linker = AccountLinker::new(
        users.clone(),
        broker.clone(),
        issuer.clone(),
        Arc::new(notifier.clone()),
        Arc::new(NoopGeoResolver),
        14,
        login_alert_chat_id,
    );

    LinkerHarness {
        users,
        broker,
        issuer,
        notifier,
        linker,
    }
}

pub struct ActionsHarness {
    pub users: Arc<InMemoryUserRepository>,
    pub tokens: Arc<InMemoryActionTokenRepository>,
    pub mailer: RecordingMailer,
    pub issuer: Arc<TokenIssuer>,
    pub actions: ActionTokenService,
}

pub fn actions_harness(breach: StaticBreachCheck, config: ActionTokenConfig) -> ActionsHarness {
    let users = Arc::new(InMemoryUserRepository::new());
    let tokens = Arc::new(InMemoryActionTokenRepository::new());
    let mailer = RecordingMailer::default();
    let issuer = Arc::new(TokenIssuer::new(users.clone(), token_config()));

    let actions = ActionTokenService::new(
        users.clone(),
        tokens.clone(),
        Arc::new(mailer.clone()),
        Arc::new(breach),
        config,
        "http://localhost:8081".into(),
    );

    ActionsHarness {
        users,
        tokens,
        mailer,
        issuer,
        actions,
    }
}
