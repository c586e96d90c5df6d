//! Application configuration and shared request state.
//!
//! Built once at startup and passed by reference; nothing here lives in
//! ambient globals.

use secrecy::SecretString;
use std::sync::Arc;

use crate::confide::auth::{FederatedStrategy, LocalStrategy, SessionManager};
use crate::confide::store::UserStore;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;

// Defaults match the provider the original deployment federates with; tests
// and other providers override them through the builders.
const DEFAULT_AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Clone)]
pub struct AuthConfig {
    session_secret: SecretString,
    session_ttl_seconds: u64,
    session_cookie_secure: bool,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    redirect_url: Option<String>,
    authorize_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(session_secret: SecretString) -> Self {
        Self {
            session_secret,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
            client_id: None,
            client_secret: None,
            redirect_url: None,
            authorize_endpoint: DEFAULT_AUTHORIZE_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: DEFAULT_USERINFO_ENDPOINT.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_provider_client(
        mut self,
        client_id: String,
        client_secret: SecretString,
        redirect_url: String,
    ) -> Self {
        self.client_id = Some(client_id);
        self.client_secret = Some(client_secret);
        self.redirect_url = Some(redirect_url);
        self
    }

    #[must_use]
    pub fn with_authorize_endpoint(mut self, endpoint: String) -> Self {
        self.authorize_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_token_endpoint(mut self, endpoint: String) -> Self {
        self.token_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_userinfo_endpoint(mut self, endpoint: String) -> Self {
        self.userinfo_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn session_secret(&self) -> &SecretString {
        &self.session_secret
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    #[must_use]
    pub fn client_secret(&self) -> Option<&SecretString> {
        self.client_secret.as_ref()
    }

    #[must_use]
    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    #[must_use]
    pub fn authorize_endpoint(&self) -> &str {
        &self.authorize_endpoint
    }

    #[must_use]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    #[must_use]
    pub fn userinfo_endpoint(&self) -> &str {
        &self.userinfo_endpoint
    }
}

/// Everything a handler needs, shared behind an `Arc` via `Extension`.
pub struct AppState {
    config: AuthConfig,
    store: Arc<dyn UserStore>,
    local: LocalStrategy,
    federated: FederatedStrategy,
    sessions: SessionManager,
}

impl AppState {
    /// # Errors
    /// Returns an error if the provider HTTP client cannot be built.
    pub fn new(config: AuthConfig, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let local = LocalStrategy::new(store.clone());
        let federated = FederatedStrategy::new(&config, store.clone())?;
        let sessions = SessionManager::new(
            config.session_secret().clone(),
            std::time::Duration::from_secs(config.session_ttl_seconds()),
        );

        Ok(Self {
            config,
            store,
            local,
            federated,
            sessions,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    #[must_use]
    pub fn local(&self) -> &LocalStrategy {
        &self.local
    }

    #[must_use]
    pub fn federated(&self) -> &FederatedStrategy {
        &self.federated
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}
