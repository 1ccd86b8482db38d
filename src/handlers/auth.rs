//! Authentication HTTP handlers
//!
//! Login, registration, password reset and token endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::middleware::ClientInfo;
use crate::models::{
    AccessTokenResponse, LoginRequest, LoginResponse, PasswordResetConfirm, PasswordResetRequest,
    RefreshTokenRequest, RegisterRequest, SuccessResponse, UserResponse, VerifyTokenRequest,
};

/// POST /api/auth/login - Exchange credentials for a token pair
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;
    let response = state.auth_service.login(&client.addr, req).await?;
    Ok(Json(response))
}

/// POST /api/auth/register - Create an account
pub async fn register(
    State(state): State<AppState>,
    client: ClientInfo,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = payload?;
    let user = state.auth_service.register(&client.addr, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/password-reset - Send a reset link if the email is known
pub async fn request_password_reset(
    State(state): State<AppState>,
    client: ClientInfo,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload?;
    let response = state
        .auth_service
        .request_password_reset(&client.addr, req)
        .await?;
    Ok(Json(response))
}

/// POST /api/auth/password-reset/confirm - Set a new password with a reset token
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    client: ClientInfo,
    payload: Result<Json<PasswordResetConfirm>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload?;
    let response = state
        .auth_service
        .confirm_password_reset(&client.addr, req)
        .await?;
    Ok(Json(response))
}

/// POST /api/token/refresh - Refresh access token using refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let Json(req) = payload?;
    let response = state.auth_service.refresh_access_token(req).await?;
    Ok(Json(response))
}

/// POST /api/token/verify - 200 with an empty object if the token is valid
pub async fn verify_token(
    State(state): State<AppState>,
    payload: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    state.auth_service.verify_token(&req.token)?;
    Ok(Json(json!({})))
}
