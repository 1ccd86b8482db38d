//! Middleware for the storefront API
//!
//! This module provides request screening, request logging, security
//! headers, and authentication extractors.

pub mod auth;
mod client;
mod screening;
mod security;
mod tracing;

pub use auth::{ensure_owner_or_admin, AdminUser, AuthenticatedUser};
pub use client::{extract_client_ip, ClientInfo};
pub use screening::screen_request;
pub use security::{
    security_headers, SecurityHeaders, CONTENT_SECURITY_POLICY, STRICT_TRANSPORT_SECURITY,
};
pub use tracing::request_tracing;
