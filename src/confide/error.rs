//! Domain error taxonomy shared by the strategies, store, and handlers.

use thiserror::Error;

/// Authentication and credential-store failures.
///
/// The route layer maps these onto redirects or status codes; credential
/// mismatches are expected user-facing conditions, not faults.
#[derive(Debug, Error)]
pub enum AuthError {
    /// An account with the submitted identifier already exists.
    #[error("an account with that identifier already exists")]
    DuplicateIdentifier,

    /// No account matches the submitted identifier.
    #[error("no account matches that identifier")]
    NotFound,

    /// The password did not match the stored hash.
    #[error("invalid credentials")]
    InvalidCredential,

    /// The identity provider rejected or failed the code exchange or
    /// profile fetch, or the call timed out.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// Federated login was requested but client credentials are not
    /// configured.
    #[error("identity provider is not configured")]
    MisconfiguredProvider,

    /// The credential store could not be reached or the query failed.
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    /// Infrastructure fault outside the user-facing taxonomy, e.g. hash
    /// derivation or token generation failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}
