// ABOUTME: SSO route handlers - auth URL, provider callback, authenticate, link, logout
// ABOUTME: Thin wrappers delegating to the broker, adapters and account linker
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSO and session route handlers

use super::{authenticated_user, request_context, AppState};
use crate::account::AuthenticateOutcome;
use crate::errors::{AppError, AppResult};
use crate::models::User;
use crate::oauth::Provider;
use crate::session::StateKey;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Response for an auth-URL request
#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    /// Nonce the client echoes back as `hash` when authenticating
    pub uuid: String,
    pub auth_url: String,
    /// Seconds until the pending session expires
    pub expires_in: u64,
}

/// Query parameters on the provider callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub state: String,
    /// Authorization code (GitHub)
    pub code: Option<String>,
    /// Access token forwarded from the fragment (Google implicit flow)
    pub access_token: Option<String>,
}

/// Minimal acknowledgement body
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

/// Authenticate request carrying the slot nonce
#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    /// The nonce from [`AuthUrlResponse::uuid`]
    pub hash: String,
    pub ref_code: Option<String>,
}

/// Link request carrying the slot nonce
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub hash: String,
}

/// Logout request naming the refresh token to revoke
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

fn parse_provider(provider: &str) -> AppResult<Provider> {
    provider.parse()
}

/// `GET /auth/{provider}/url`
pub async fn get_auth_url(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> AppResult<Json<AuthUrlResponse>> {
    let provider = parse_provider(&provider)?;
    let adapter = state.registry.get(provider)?;

    let key = StateKey::generate(provider);
    state.broker.create_pending_session(&key).await?;

    Ok(Json(AuthUrlResponse {
        auth_url: adapter.build_auth_url(&key.nonce),
        uuid: key.nonce,
        expires_in: state.broker.ttl().as_secs(),
    }))
}

/// `GET /auth/{provider}/callback`
///
/// Exchanges the forwarded credential and writes the resulting claims into
/// the pending slot keyed by `state`.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> AppResult<Json<AckResponse>> {
    let provider = parse_provider(&provider)?;
    let adapter = state.registry.get(provider)?;

    let credential = params
        .code
        .or(params.access_token)
        .ok_or_else(|| AppError::invalid_input("Missing provider credential"))?;

    let identity = adapter.exchange_for_identity(&credential).await?;
    let key = StateKey::new(provider, params.state);
    state.broker.write_session_result(&key, &identity).await?;

    Ok(Json(AckResponse { success: true }))
}

/// `POST /auth/{provider}/authenticate`
pub async fn authenticate(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AuthenticateRequest>,
) -> AppResult<Json<AuthenticateOutcome>> {
    let provider = parse_provider(&provider)?;
    let ctx = request_context(&headers);

    let outcome = state
        .linker
        .authenticate(provider, &request.hash, &ctx, request.ref_code.as_deref())
        .await?;
    Ok(Json(outcome))
}

/// `POST /auth/{provider}/link`
pub async fn link(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(request): Json<LinkRequest>,
) -> AppResult<Json<User>> {
    let provider = parse_provider(&provider)?;
    let user_id = authenticated_user(&headers, &state.issuer)?;

    let user = state.linker.link(user_id, provider, &request.hash).await?;
    Ok(Json(user))
}

/// `DELETE /auth/{provider}/link`
pub async fn unlink(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<User>> {
    let provider = parse_provider(&provider)?;
    let user_id = authenticated_user(&headers, &state.issuer)?;

    let user = state.linker.unlink(user_id, provider).await?;
    Ok(Json(user))
}

/// `POST /auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LogoutRequest>,
) -> AppResult<Json<AckResponse>> {
    let user_id = authenticated_user(&headers, &state.issuer)?;
    state.issuer.revoke(user_id, &request.refresh_token).await?;
    Ok(Json(AckResponse { success: true }))
}

/// `POST /auth/logout-all`
pub async fn logout_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<AckResponse>> {
    let user_id = authenticated_user(&headers, &state.issuer)?;
    state.issuer.revoke_all(user_id).await?;
    Ok(Json(AckResponse { success: true }))
}
