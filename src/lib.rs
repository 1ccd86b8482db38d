//! Storefront Backend Library
//!
//! Security-screening middleware, rate-limited authentication, security
//! headers and password reset for the storefront API.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod routes;
pub mod security;
pub mod store;

pub use app_state::AppState;
pub use routes::app;
