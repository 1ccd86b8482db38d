//! User-related API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{ensure_owner_or_admin, AdminUser, AuthenticatedUser, ClientInfo};
use crate::models::UserResponse;

/// GET /api/users/me - The caller's own account
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<UserResponse>> {
    let user = state.auth_service.get_user_by_id(user.user_id).await?;
    Ok(Json(user.into()))
}

/// GET /api/users - Every account (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state.auth_service.list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /api/users/:id - One account (owner or admin)
pub async fn get_user(
    State(state): State<AppState>,
    client: ClientInfo,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user_id =
        Uuid::parse_str(&user_id).map_err(|_| ApiError::NotFound("Not found.".to_string()))?;

    ensure_owner_or_admin(&user, user_id, &state.auth_service, &client.addr).await?;

    let found = state.auth_service.get_user_by_id(user_id).await?;
    Ok(Json(found.into()))
}
