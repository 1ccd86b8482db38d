//! User identity store
//!
//! The account table is owned by the data layer. The auth core only needs
//! lookups by id/username/email, creation and password replacement, so
//! that is all [`UserStore`] exposes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, User};

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// User store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("User not found")]
    NotFound,

    /// Unique constraint violated on the named field
    #[error("Duplicate value for {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let field = match db.constraint() {
                    Some(c) if c.contains("email") => "email",
                    _ => "username",
                };
                StoreError::Conflict(field.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users, oldest first
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Insert a new account. Fails with [`StoreError::Conflict`] when the
    /// username or email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;

    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.find_by_email(email).await?.is_some())
    }
}
