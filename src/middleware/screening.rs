//! Request screening middleware
//!
//! Runs every request's query values, form fields and JSON body through the
//! pattern screener before routing. A match records one security incident
//! and answers 403 without reaching a handler.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use url::form_urlencoded;

use super::client::ClientInfo;
use crate::app_state::AppState;
use crate::error::ApiError;
use crate::security::{RequestInput, SecurityIncident, Verdict};

const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn of(method: &Method, headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            BodyKind::Json
        } else if method == Method::POST
            && content_type.starts_with("application/x-www-form-urlencoded")
        {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

fn query_inputs(parts: &Parts) -> Vec<RequestInput> {
    parts
        .uri
        .query()
        .map(|query| {
            form_urlencoded::parse(query.as_bytes())
                .map(|(key, value)| RequestInput::query(key, value))
                .collect()
        })
        .unwrap_or_default()
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse().ok())
}

/// Username behind the request's bearer token, if it verifies
fn acting_user(state: &AppState, headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| state.auth_service.verify_token(token.trim()).ok())
        .map(|claims| claims.username)
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

/// Middleware that screens request inputs for injection patterns
pub async fn screen_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let mut inputs = query_inputs(&parts);

    let body = match BodyKind::of(&parts.method, &parts.headers) {
        BodyKind::Other => body,
        kind => {
            if declared_length(&parts.headers).is_some_and(|len| len > state.max_body_bytes) {
                return ApiError::PayloadTooLarge.into_response();
            }

            let bytes = match to_bytes(body, state.max_body_bytes).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to buffer request body");
                    return ApiError::PayloadTooLarge.into_response();
                }
            };

            match kind {
                BodyKind::Json => {
                    inputs.push(RequestInput::json_body(String::from_utf8_lossy(&bytes)));
                }
                _ => {
                    inputs.extend(
                        form_urlencoded::parse(&bytes)
                            .map(|(key, value)| RequestInput::form(key, value)),
                    );
                }
            }

            Body::from(bytes)
        }
    };

    if let Verdict::Blocked { category, .. } = state.screener.screen(&inputs) {
        let client = ClientInfo::from_parts(&parts.headers, &parts.extensions);
        state.security_log.incident(SecurityIncident {
            timestamp: Utc::now(),
            client_addr: client.addr,
            user_agent: client.user_agent,
            path: parts.uri.path().to_string(),
            method: parts.method.to_string(),
            user: acting_user(&state, &parts.headers),
            reason: category.incident_reason().to_string(),
        });
        return ApiError::SecurityBlock(category.block_message().to_string()).into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_type(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_body_kind() {
        assert_eq!(
            BodyKind::of(&Method::POST, &headers_with_type("application/json; charset=utf-8")),
            BodyKind::Json
        );
        assert_eq!(
            BodyKind::of(&Method::POST, &headers_with_type("application/x-www-form-urlencoded")),
            BodyKind::Form
        );
        assert_eq!(
            BodyKind::of(&Method::PUT, &headers_with_type("application/x-www-form-urlencoded")),
            BodyKind::Other
        );
        assert_eq!(
            BodyKind::of(&Method::POST, &headers_with_type("multipart/form-data")),
            BodyKind::Other
        );
    }

    #[test]
    fn test_query_inputs_are_decoded() {
        let (parts, _) = Request::builder()
            .uri("/api/products?q=a%20b&page=2")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let inputs = query_inputs(&parts);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].value, "a b");
        assert_eq!(inputs[1].value, "2");
    }
}
