// ABOUTME: HTTP route assembly and shared request state
// ABOUTME: Router wiring, bearer-token extraction and request-context capture
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the authentication core

/// Action-token flow handlers (verification, reset, email change)
pub mod account;
/// SSO and session handlers
pub mod auth;

use crate::account::AccountLinker;
use crate::actions::ActionTokenService;
use crate::errors::{AppError, AppResult};
use crate::models::RequestContext;
use crate::oauth::ProviderRegistry;
use crate::session::SessionBroker;
use crate::tokens::TokenIssuer;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use uuid::Uuid;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ProviderRegistry>,
    pub broker: SessionBroker,
    pub linker: Arc<AccountLinker>,
    pub issuer: Arc<TokenIssuer>,
    pub actions: Arc<ActionTokenService>,
}

/// Assemble the full auth router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/:provider/url", get(auth::get_auth_url))
        .route("/auth/:provider/callback", get(auth::callback))
        .route("/auth/:provider/authenticate", post(auth::authenticate))
        .route("/auth/:provider/link", post(auth::link).delete(auth::unlink))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/auth/verification/request", post(account::request_verification))
        .route("/auth/verification/confirm", post(account::confirm_verification))
        .route("/auth/password-reset/request", post(account::request_password_reset))
        .route("/auth/password-reset/confirm", post(account::confirm_password_reset))
        .route("/auth/email-change/request", post(account::request_email_change))
        .route("/auth/email-change/confirm", post(account::confirm_email_change))
        .with_state(state)
}

/// Resolve the bearer access token to a user id
pub(crate) fn authenticated_user(headers: &HeaderMap, issuer: &TokenIssuer) -> AppResult<Uuid> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(AppError::auth_required)?;

    let claims = issuer.validate_access_token(token)?;
    Uuid::parse_str(&claims.sub).map_err(|_| AppError::auth_invalid("Invalid subject in token"))
}

/// Capture client context from proxy headers
pub(crate) fn request_context(headers: &HeaderMap) -> RequestContext {
    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_owned());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);

    RequestContext { ip, user_agent }
}
