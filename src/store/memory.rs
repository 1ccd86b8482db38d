//! In-memory user store, used when no database is configured and in tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::models::{NewUser, User};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the admin flag on an existing account
    pub async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.is_admin = is_admin;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        // Uniqueness is checked under the same write lock as the insert
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == new_user.username) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&new_user.email))
        {
            return Err(StoreError::Conflict("email".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            name: String::new(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("alice", "alice@example.com")).await.unwrap();

        assert!(!user.is_admin);
        assert_eq!(store.find_by_id(user.id).await.unwrap().unwrap().username, "alice");
        assert!(store.username_exists("alice").await.unwrap());
        assert!(store.email_exists("ALICE@example.com").await.unwrap());
        assert!(!store.username_exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicates_conflict() {
        let store = MemoryUserStore::new();
        store.create(new_user("alice", "alice@example.com")).await.unwrap();

        let err = store
            .create(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(f) if f == "username"));

        let err = store
            .create(new_user("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(f) if f == "email"));
    }

    #[tokio::test]
    async fn test_set_password_and_admin() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("alice", "alice@example.com")).await.unwrap();

        store.set_password(user.id, "new-hash").await.unwrap();
        store.set_admin(user.id, true).await.unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.is_admin);

        assert!(matches!(
            store.set_password(Uuid::new_v4(), "x").await,
            Err(StoreError::NotFound)
        ));
    }
}
