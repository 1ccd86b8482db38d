//! Data models for the storefront backend
//!
//! Only the account entity is modelled here; catalog, order and notification
//! records live entirely in the data layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// User account as held by the user store
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            is_admin: user.is_admin,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        user.clone().into()
    }
}
