//! Route definitions for the storefront API

mod auth;
mod user;

pub use auth::auth_routes;
pub use user::user_routes;

use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::app_state::AppState;
use crate::config::Config;
use crate::handlers;
use crate::middleware;

/// Build the full application: routes plus the request pipeline
///
/// Layers, outermost first: CORS, security headers, request logging,
/// request screening. Blocked requests still pass back through the
/// headers layer.
pub fn app(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .merge(user_routes())
        .nest_service("/static", ServeDir::new(&config.static_root))
        .nest_service("/media", ServeDir::new(&config.media_root))
        .layer(from_fn_with_state(state.clone(), middleware::screen_request))
        .layer(from_fn(middleware::request_tracing))
        .layer(from_fn_with_state(
            state.security_headers,
            middleware::security_headers,
        ))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()))
        .with_state(state)
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(allowed_origins) = allowed_origins.filter(|s| !s.trim().is_empty()) else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
