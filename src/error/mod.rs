//! Centralized API error handling
//!
//! This module provides a unified error type for API responses with proper
//! HTTP status code mapping and JSON error responses. Body shapes follow the
//! REST conventions clients already rely on: `{"detail": ...}` for generic
//! failures, `{"error": ...}` for password-reset outcomes and `{field: [...]}`
//! for field validation.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::{JwtError, PasswordError};
use crate::rate_limiter::CounterError;
use crate::store::StoreError;

/// Field name to list of messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Message returned for every reset-token failure, whatever the cause
pub const INVALID_TOKEN_MESSAGE: &str = "Token is invalid or expired";

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Password does not meet policy")]
    PasswordPolicy(Vec<String>),

    #[error("{}", INVALID_TOKEN_MESSAGE)]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    SecurityBlock(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ApiError {
    /// Single-field validation error
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        ApiError::Validation(errors)
    }

    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Rejected(_) => "BAD_REQUEST",
            ApiError::PasswordPolicy(_) => "PASSWORD_POLICY",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::SecurityBlock(_) => "SECURITY_BLOCK",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::BadRequest(_)
            | ApiError::Rejected(_)
            | ApiError::PasswordPolicy(_)
            | ApiError::InvalidToken => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::SecurityBlock(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::SecurityBlock(msg)
            | ApiError::NotFound(msg) => json!({ "detail": msg }),
            ApiError::Rejected(msg) => json!({ "error": msg }),
            ApiError::PasswordPolicy(errors) => json!({ "error": errors }),
            ApiError::InvalidToken => json!({ "error": INVALID_TOKEN_MESSAGE }),
            ApiError::TooManyRequests => {
                json!({ "detail": "Request was throttled. Please try again later." })
            }
            ApiError::PayloadTooLarge => json!({ "detail": "Request body too large" }),
            // Internal details stay in the logs
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                json!({ "detail": "Internal server error" })
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        match &self {
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                tracing::error!(error = %self, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %self, code = %error_code, "Client error occurred");
            }
        }

        let body = Json(self.body());

        if matches!(self, ApiError::TooManyRequests) {
            return (status, [(header::RETRY_AFTER, "60")], body).into_response();
        }

        (status, body).into_response()
    }
}

// Convenience conversions from collaborator error types

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Not found.".to_string()),
            StoreError::Conflict(field) => {
                ApiError::field(&field, &format!("A user with that {} already exists.", field))
            }
            StoreError::Database(msg) => ApiError::DatabaseError(msg),
        }
    }
}

impl From<CounterError> for ApiError {
    fn from(err: CounterError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized("Token is invalid or expired".to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errors) in err.field_errors() {
            let messages = errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({}).", e.code))
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        ApiError::Validation(fields)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", err.body_text()))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
