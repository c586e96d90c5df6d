//! User records and the credential store interface.

use async_trait::async_trait;
use uuid::Uuid;

use crate::confide::error::AuthError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A stored account.
///
/// Invariant: at least one of `password_hash` or `federated_id` is set, so
/// every account is reachable through some authentication path. `id` is
/// assigned by the store on creation and never changes; it is the only field
/// that ends up in session state.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Identifying email; present only for local accounts.
    pub email: Option<String>,
    /// Argon2 PHC string; present only for local accounts. Never the
    /// plaintext password.
    pub password_hash: Option<String>,
    /// Provider-assigned stable subject id; present only for federated
    /// accounts.
    pub federated_id: Option<String>,
    pub secret: Option<String>,
}

/// Persistence boundary for accounts.
///
/// Implementations enforce uniqueness of `email` and `federated_id`.
/// Infrastructure failures surface as [`AuthError::StoreUnavailable`]; they
/// are not retried here.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a local account. Fails with `DuplicateIdentifier` when the
    /// email is already registered.
    async fn create_local(&self, email: &str, password_hash: &str) -> Result<User, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Fetch the account for a provider subject id, creating it when absent.
    ///
    /// Must converge under concurrent duplicate callbacks: the uniqueness
    /// constraint on `federated_id` wins the race and the loser re-fetches.
    async fn find_or_create_federated(&self, federated_id: &str) -> Result<User, AuthError>;

    /// Overwrite the account's secret. Full replacement, not append.
    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<(), AuthError>;

    /// All non-null secrets, for the public listing. Returns only the secret
    /// text; credential material never leaves the store through this path.
    async fn list_secrets(&self) -> Result<Vec<String>, AuthError>;
}
