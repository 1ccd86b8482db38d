//! Authentication routes

use axum::{routing::post, Router};

use crate::app_state::AppState;
use crate::handlers::auth;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/password-reset", post(auth::request_password_reset))
        .route(
            "/api/auth/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        .route("/api/token/refresh", post(auth::refresh_token))
        .route("/api/token/verify", post(auth::verify_token))
}
