//! Request logging middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use super::client::ClientInfo;

/// Paths served straight from disk; too noisy to log
const QUIET_PREFIXES: [&str; 2] = ["/static/", "/media/"];

fn is_quiet(path: &str) -> bool {
    QUIET_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Middleware for logging request information with timing
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_quiet(&path) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let client = ClientInfo::from_parts(request.headers(), request.extensions());
    let start = Instant::now();

    tracing::info!(
        method = %method,
        path = %path,
        client_ip = %client.addr,
        user_agent = %client.user_agent,
        "Request started"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}
