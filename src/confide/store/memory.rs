//! In-memory credential store.
//!
//! Backs the test suite and keeps the strategies honest about going through
//! the [`UserStore`] interface rather than leaning on Postgres semantics.

use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

use super::{User, UserStore};
use crate::confide::error::AuthError;

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts. Test helper.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.lock().map(|users| users.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_local(&self, email: &str, password_hash: &str) -> Result<User, AuthError> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| AuthError::StoreUnavailable("store lock poisoned".to_string()))?;

        if users.iter().any(|user| user.email.as_deref() == Some(email)) {
            return Err(AuthError::DuplicateIdentifier);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            password_hash: Some(password_hash.to_string()),
            federated_id: None,
            secret: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let users = self
            .users
            .lock()
            .map_err(|_| AuthError::StoreUnavailable("store lock poisoned".to_string()))?;
        Ok(users
            .iter()
            .find(|user| user.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let users = self
            .users
            .lock()
            .map_err(|_| AuthError::StoreUnavailable("store lock poisoned".to_string()))?;
        Ok(users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_or_create_federated(&self, federated_id: &str) -> Result<User, AuthError> {
        // Single lock covers lookup and insert, which is the in-memory
        // equivalent of the uniqueness constraint in Postgres.
        let mut users = self
            .users
            .lock()
            .map_err(|_| AuthError::StoreUnavailable("store lock poisoned".to_string()))?;

        if let Some(user) = users
            .iter()
            .find(|user| user.federated_id.as_deref() == Some(federated_id))
        {
            return Ok(user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: None,
            password_hash: None,
            federated_id: Some(federated_id.to_string()),
            secret: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<(), AuthError> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| AuthError::StoreUnavailable("store lock poisoned".to_string()))?;
        let user = users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(AuthError::NotFound)?;
        user.secret = Some(secret.to_string());
        Ok(())
    }

    async fn list_secrets(&self) -> Result<Vec<String>, AuthError> {
        let users = self
            .users
            .lock()
            .map_err(|_| AuthError::StoreUnavailable("store lock poisoned".to_string()))?;
        Ok(users.iter().filter_map(|user| user.secret.clone()).collect())
    }
}
