//! Authentication request/response models

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::UserResponse;

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Login credentials
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response: token pair plus the public user representation
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserResponse,
}

/// Registration payload
///
/// Missing fields deserialize to empty strings so that they surface as field
/// errors rather than a JSON rejection.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 150, message = "This field may not be blank."),
        custom = "validate_username_chars"
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub name: String,

    #[validate(
        length(min = 8, message = "Ensure this field has at least 8 characters."),
        custom = "validate_password_mix"
    )]
    pub password: String,

    pub password_confirm: Option<String>,
}

/// Password reset request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Password reset confirmation
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

/// Refresh token exchange
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshTokenRequest {
    pub refresh: String,
}

/// New access token
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Token verification request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyTokenRequest {
    pub token: String,
}

/// `{"success": "..."}`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: String,
}

impl SuccessResponse {
    pub fn new(message: &str) -> Self {
        Self {
            success: message.to_string(),
        }
    }
}

/// Letters, digits and `@ . + - _` only
fn validate_username_chars(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_chars");
        err.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(err)
    }
}

fn validate_password_mix(password: &str) -> Result<(), ValidationError> {
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_letter = password.chars().any(|c| c.is_alphabetic());

    if has_digit && has_letter {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_mix");
        err.message = Some("Password must contain both letters and numbers".into());
        Err(err)
    }
}
