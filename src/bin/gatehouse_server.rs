// ABOUTME: Server binary wiring the authentication core to its collaborators
// ABOUTME: Config from env, SQLite store, axum routes with request tracing
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Gatehouse Server Binary
//!
//! Assembles the authentication core: SQLite-backed repositories, the
//! in-memory pending-session store, provider adapters and the HTTP routes.

use anyhow::Result;
use gatehouse::{
    account::AccountLinker,
    actions::ActionTokenService,
    config::ServerConfig,
    database::sql::Database,
    external::breach::PwnedPasswordsClient,
    external::{IpApiGeoResolver, LogMailer, LogNotifier, Notifier, TelegramNotifier},
    oauth::{GitHubAdapter, GoogleAdapter, ProviderRegistry},
    routes::{router, AppState},
    session::SessionBroker,
    store::memory::InMemorySessionStore,
    tokens::TokenIssuer,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        )
        .with(fmt::layer())
        .init();

    info!("Starting Gatehouse on port {}", config.http_port);

    let database = Arc::new(Database::connect(&config.database_url).await?);
    let users: Arc<dyn gatehouse::database::UserRepository> = database.clone();
    let action_tokens: Arc<dyn gatehouse::database::ActionTokenRepository> = database;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.outbound_timeout_secs))
        .build()?;

    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(GoogleAdapter::new(config.google.clone(), http.clone())));
    registry.register(Box::new(GitHubAdapter::new(config.github.clone(), http.clone())));

    let store = Arc::new(InMemorySessionStore::new(config.session.max_pending));
    let broker = SessionBroker::new(store, Duration::from_secs(config.session.ttl_secs));

    let issuer = Arc::new(TokenIssuer::new(users.clone(), config.tokens.clone()));

    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(http.clone(), token.clone())),
        None => Arc::new(LogNotifier),
    };
    let geo = Arc::new(IpApiGeoResolver::new(http.clone()));

    let linker = Arc::new(AccountLinker::new(
        users.clone(),
        broker.clone(),
        issuer.clone(),
        notifier,
        geo,
        config.trial_days,
        config.login_alert_chat_id,
    ));

    let actions = Arc::new(ActionTokenService::new(
        users,
        action_tokens,
        Arc::new(LogMailer),
        Arc::new(PwnedPasswordsClient::new(http)),
        config.action_tokens,
        config.base_url.clone(),
    ));

    let state = AppState {
        registry: Arc::new(registry),
        broker,
        linker,
        issuer,
        actions,
    };

    let app = router(state).layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
