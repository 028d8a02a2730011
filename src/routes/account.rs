// ABOUTME: Action-token route handlers for the mailed account flows
// ABOUTME: Verification, password reset and email change request/confirm pairs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action-token flow route handlers

use super::{authenticated_user, AppState};
use crate::errors::AppResult;
use crate::routes::auth::AckResponse;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

/// Request carrying an action token id
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Password-reset request by email
#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Password-reset confirmation
#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub password: String,
}

/// Email-change request
#[derive(Debug, Deserialize)]
pub struct EmailChangeRequest {
    pub new_email: String,
}

/// `POST /auth/verification/request`
pub async fn request_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<AckResponse>> {
    let user_id = authenticated_user(&headers, &state.issuer)?;
    state.actions.request_verification(user_id).await?;
    Ok(Json(AckResponse { success: true }))
}

/// `POST /auth/verification/confirm`
pub async fn confirm_verification(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> AppResult<Json<AckResponse>> {
    state.actions.confirm_verification(&request.token).await?;
    Ok(Json(AckResponse { success: true }))
}

/// `POST /auth/password-reset/request`
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> AppResult<Json<AckResponse>> {
    state.actions.request_password_reset(&request.email).await?;
    Ok(Json(AckResponse { success: true }))
}

/// `POST /auth/password-reset/confirm`
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirm>,
) -> AppResult<Json<AckResponse>> {
    state
        .actions
        .confirm_password_reset(&request.token, &request.password)
        .await?;
    Ok(Json(AckResponse { success: true }))
}

/// `POST /auth/email-change/request`
pub async fn request_email_change(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<EmailChangeRequest>,
) -> AppResult<Json<AckResponse>> {
    let user_id = authenticated_user(&headers, &state.issuer)?;
    state
        .actions
        .request_email_change(user_id, &request.new_email)
        .await?;
    Ok(Json(AckResponse { success: true }))
}

/// `POST /auth/email-change/confirm`
pub async fn confirm_email_change(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> AppResult<Json<AckResponse>> {
    state.actions.confirm_email_change(&request.token).await?;
    Ok(Json(AckResponse { success: true }))
}
