//! Server-held sessions keyed by an opaque client token.
//!
//! The client only ever holds a random token; the server keys its state by a
//! keyed SHA-256 hash of that token, with the signing secret as the hash key.
//! A forged or tampered cookie therefore never finds a session. Only the
//! user id is serialized into session state.
//!
//! State is split across shards keyed by the token hash, so concurrent
//! requests bearing different tokens land on different locks. Abandoned
//! sessions (token never presented again) are swept on establish, which
//! bounds the map by the number of live sessions rather than the number of
//! logins ever made.

use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::confide::error::AuthError;
use crate::confide::store::User;

const SHARD_COUNT: usize = 16;

struct SessionState {
    user_id: Uuid,
    last_seen: Instant,
}

pub struct SessionManager {
    signing_secret: SecretString,
    idle_timeout: Duration,
    shards: Vec<RwLock<HashMap<Vec<u8>, SessionState>>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(signing_secret: SecretString, idle_timeout: Duration) -> Self {
        Self {
            signing_secret,
            idle_timeout,
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    /// Start an authenticated session and return the opaque token for the
    /// cookie. Only `user.id` is retained server-side.
    ///
    /// Logins are rare relative to resolves, so this is also where expired
    /// sessions whose tokens were never presented again get swept.
    ///
    /// # Errors
    /// `Internal` if the system RNG fails to produce a token.
    pub async fn establish(&self, user: &User) -> Result<String, AuthError> {
        self.sweep_expired().await;

        let token = generate_token()?;
        let key = self.key_for(&token);

        let mut sessions = self.shard_for(&key).write().await;
        sessions.insert(
            key,
            SessionState {
                user_id: user.id,
                last_seen: Instant::now(),
            },
        );
        Ok(token)
    }

    /// Resolve a token to the user id it references.
    ///
    /// `None` for tokens that were never issued, were terminated, or idled
    /// out; resolving a live session refreshes its idle clock. Never errors:
    /// a stale session is an anonymous request, not a fault.
    pub async fn resolve(&self, token: &str) -> Option<Uuid> {
        let key = self.key_for(token);
        let mut sessions = self.shard_for(&key).write().await;

        let expired = match sessions.get_mut(&key) {
            Some(state) => {
                if state.last_seen.elapsed() <= self.idle_timeout {
                    state.last_seen = Instant::now();
                    return Some(state.user_id);
                }
                true
            }
            None => false,
        };

        if expired {
            sessions.remove(&key);
        }
        None
    }

    /// Invalidate a session. Resolving the same token afterwards yields
    /// `None`. Unknown tokens are a no-op.
    pub async fn terminate(&self, token: &str) {
        let key = self.key_for(token);
        self.shard_for(&key).write().await.remove(&key);
    }

    /// Number of live sessions across all shards.
    #[must_use]
    pub async fn active_sessions(&self) -> usize {
        let mut count = 0;
        for shard in &self.shards {
            count += shard.read().await.len();
        }
        count
    }

    async fn sweep_expired(&self) {
        for shard in &self.shards {
            shard
                .write()
                .await
                .retain(|_, state| state.last_seen.elapsed() <= self.idle_timeout);
        }
    }

    fn key_for(&self, token: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_secret.expose_secret().as_bytes());
        hasher.update(token.as_bytes());
        hasher.finalize().to_vec()
    }

    fn shard_for(&self, key: &[u8]) -> &RwLock<HashMap<Vec<u8>, SessionState>> {
        // The key is a SHA-256 digest, so its first byte is uniform.
        let index = key.first().copied().unwrap_or(0) as usize % SHARD_COUNT;
        &self.shards[index]
    }
}

/// 32 random bytes, base64url. The raw value only travels in the cookie.
fn generate_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| AuthError::Internal(format!("failed to generate session token: {err}")))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: Some("a@x.com".to_string()),
            password_hash: Some("phc".to_string()),
            federated_id: None,
            secret: None,
        }
    }

    fn manager(idle: Duration) -> SessionManager {
        SessionManager::new(SecretString::from("signing-secret"), idle)
    }

    #[tokio::test]
    async fn establish_then_resolve_returns_the_same_id() {
        let sessions = manager(Duration::from_secs(60));
        let user = user();
        let token = sessions.establish(&user).await.unwrap();
        assert_eq!(sessions.resolve(&token).await, Some(user.id));
    }

    #[tokio::test]
    async fn never_issued_token_is_anonymous() {
        let sessions = manager(Duration::from_secs(60));
        assert_eq!(sessions.resolve("not-a-token").await, None);
    }

    #[tokio::test]
    async fn terminated_token_is_anonymous() {
        let sessions = manager(Duration::from_secs(60));
        let user = user();
        let token = sessions.establish(&user).await.unwrap();
        sessions.terminate(&token).await;
        assert_eq!(sessions.resolve(&token).await, None);
    }

    #[tokio::test]
    async fn terminate_unknown_token_is_a_noop() {
        let sessions = manager(Duration::from_secs(60));
        sessions.terminate("never-issued").await;
    }

    #[tokio::test]
    async fn idle_session_expires() {
        let sessions = manager(Duration::from_millis(20));
        let user = user();
        let token = sessions.establish(&user).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(sessions.resolve(&token).await, None);
    }

    #[tokio::test]
    async fn resolving_refreshes_the_idle_clock() {
        let sessions = manager(Duration::from_millis(60));
        let user = user();
        let token = sessions.establish(&user).await.unwrap();
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(30)).await;
            assert_eq!(sessions.resolve(&token).await, Some(user.id));
        }
    }

    #[tokio::test]
    async fn tampered_token_is_anonymous() {
        let sessions = manager(Duration::from_secs(60));
        let user = user();
        let token = sessions.establish(&user).await.unwrap();
        let mut tampered = token.clone();
        tampered.push('A');
        assert_eq!(sessions.resolve(&tampered).await, None);
    }

    #[tokio::test]
    async fn sessions_are_independent_per_token() {
        let sessions = manager(Duration::from_secs(60));
        let alice = user();
        let bob = user();
        let alice_token = sessions.establish(&alice).await.unwrap();
        let bob_token = sessions.establish(&bob).await.unwrap();
        sessions.terminate(&alice_token).await;
        assert_eq!(sessions.resolve(&bob_token).await, Some(bob.id));
    }

    #[tokio::test]
    async fn abandoned_sessions_are_swept_on_establish() {
        let sessions = manager(Duration::from_millis(5));
        for _ in 0..50 {
            sessions.establish(&user()).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        // None of the 50 tokens are ever presented again; the next login
        // reclaims them all.
        let token = sessions.establish(&user()).await.unwrap();
        assert_eq!(sessions.active_sessions().await, 1);
        assert!(sessions.resolve(&token).await.is_some());
    }

    #[tokio::test]
    async fn live_sessions_survive_the_sweep() {
        let sessions = manager(Duration::from_secs(60));
        let alice = user();
        let alice_token = sessions.establish(&alice).await.unwrap();
        sessions.establish(&user()).await.unwrap();
        assert_eq!(sessions.active_sessions().await, 2);
        assert_eq!(sessions.resolve(&alice_token).await, Some(alice.id));
    }
}
