//! User routes

use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::handlers::user;

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(user::list_users))
        .route("/api/users/me", get(user::get_current_user))
        .route("/api/users/:id", get(user::get_user))
}
