//! Password hashing and strength policy

use thiserror::Error;

/// Symbols that satisfy the "special character" rule
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?/~`";

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Password hashing task failed: {0}")]
    Task(String),
}

/// Hash a password with bcrypt on the blocking pool
pub async fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check a password against a bcrypt hash. Malformed hashes verify as false.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))
}

/// Composite strength policy for new passwords.
///
/// Returns one message per failed rule; empty means the password passes.
pub fn check_password_strength(password: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters long".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        errors.push("Password must contain at least one special character".to_string());
    }

    errors
}
