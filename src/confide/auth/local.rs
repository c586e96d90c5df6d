//! Local username/password authentication against stored Argon2 hashes.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::debug;

use crate::confide::error::AuthError;
use crate::confide::store::{User, UserStore};

pub struct LocalStrategy {
    store: Arc<dyn UserStore>,
}

impl LocalStrategy {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Create an account for a new email. The plaintext password never
    /// reaches the store; only the Argon2id PHC string does.
    ///
    /// # Errors
    /// `DuplicateIdentifier` when the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let password_hash = hash_password(password)?;
        let user = self.store.create_local(email, &password_hash).await?;
        debug!(user_id = %user.id, "registered local account");
        Ok(user)
    }

    /// Verify a password for an existing account.
    ///
    /// # Errors
    /// `NotFound` for an unknown email, `InvalidCredential` when the hash
    /// comparison fails. The comparison itself is constant-time, courtesy of
    /// the `argon2` crate.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let Some(stored) = user.password_hash.as_deref() else {
            // Federated-only account; there is no password to check.
            return Err(AuthError::InvalidCredential);
        };

        if verify_password(stored, password) {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredential)
        }
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|err| AuthError::Internal(format!("password hashing failed: {err}")))
}

fn verify_password(stored: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confide::store::MemoryStore;

    fn strategy() -> (Arc<MemoryStore>, LocalStrategy) {
        let store = Arc::new(MemoryStore::new());
        let strategy = LocalStrategy::new(store.clone());
        (store, strategy)
    }

    #[tokio::test]
    async fn register_then_authenticate_roundtrip() {
        let (_store, local) = strategy();
        let registered = local.register("a@x.com", "p1").await.unwrap();
        let authenticated = local.authenticate("a@x.com", "p1").await.unwrap();
        assert_eq!(registered.id, authenticated.id);
    }

    #[tokio::test]
    async fn register_never_stores_plaintext() {
        let (store, local) = strategy();
        local.register("a@x.com", "p1").await.unwrap();
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        let hash = user.password_hash.unwrap();
        assert_ne!(hash, "p1");
        assert!(hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn duplicate_register_fails_and_keeps_existing_record() {
        let (store, local) = strategy();
        let first = local.register("a@x.com", "p1").await.unwrap();
        let err = local.register("a@x.com", "p2").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentifier));

        // The original credentials still work; the second attempt changed
        // nothing.
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.id, first.id);
        assert!(local.authenticate("a@x.com", "p1").await.is_ok());
        assert!(local.authenticate("a@x.com", "p2").await.is_err());
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credential() {
        let (_store, local) = strategy();
        local.register("a@x.com", "p1").await.unwrap();
        let err = local.authenticate("a@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let (_store, local) = strategy();
        let err = local.authenticate("nobody@x.com", "p1").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
    }

    #[tokio::test]
    async fn federated_only_account_rejects_password_login() {
        let (store, local) = strategy();
        let user = store.find_or_create_federated("sub-1").await.unwrap();
        assert!(user.email.is_none());
        // No email means no lookup hit, which reads as NotFound.
        let err = local.authenticate("sub-1", "p1").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
    }
}
