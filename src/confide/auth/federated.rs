//! Federated login via an OAuth2 authorization-code flow.
//!
//! The provider hands back a code on its callback; we exchange it for an
//! access token, fetch the profile, and map the stable subject id onto a
//! local account with find-or-create semantics.

use anyhow::Context;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::confide::error::AuthError;
use crate::confide::state::AuthConfig;
use crate::confide::store::{User, UserStore};
use crate::confide::APP_USER_AGENT;

// Code exchange must not hang the request; expiry surfaces as a provider
// error.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct Profile {
    sub: String,
}

struct ProviderClient {
    client_id: String,
    client_secret: SecretString,
    redirect_url: String,
}

pub struct FederatedStrategy {
    store: Arc<dyn UserStore>,
    http: Client,
    provider: Option<ProviderClient>,
    authorize_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl FederatedStrategy {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .context("failed to build provider HTTP client")?;

        let provider = match (
            config.client_id(),
            config.client_secret(),
            config.redirect_url(),
        ) {
            (Some(id), Some(secret), Some(redirect)) => Some(ProviderClient {
                client_id: id.to_string(),
                client_secret: secret.clone(),
                redirect_url: redirect.to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            store,
            http,
            provider,
            authorize_endpoint: config.authorize_endpoint().to_string(),
            token_endpoint: config.token_endpoint().to_string(),
            userinfo_endpoint: config.userinfo_endpoint().to_string(),
        })
    }

    /// Where to send the browser to start the flow.
    ///
    /// # Errors
    /// `MisconfiguredProvider` when client credentials are absent.
    pub fn authorize_url(&self) -> Result<String, AuthError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(AuthError::MisconfiguredProvider)?;

        let url = Url::parse_with_params(
            &self.authorize_endpoint,
            &[
                ("client_id", provider.client_id.as_str()),
                ("redirect_uri", provider.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid"),
            ],
        )
        .map_err(|err| AuthError::Internal(format!("bad authorize endpoint: {err}")))?;

        Ok(url.into())
    }

    /// Finish the flow with the authorization code from the callback.
    ///
    /// Idempotent for a given provider subject: concurrent duplicate
    /// callbacks converge on one account through the store's uniqueness
    /// constraint.
    ///
    /// # Errors
    /// `MisconfiguredProvider` without client credentials; `Provider` when
    /// the exchange or profile fetch fails or times out.
    pub async fn complete(&self, code: &str) -> Result<User, AuthError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(AuthError::MisconfiguredProvider)?;

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", provider.client_id.as_str()),
                ("client_secret", provider.client_secret.expose_secret()),
                ("redirect_uri", provider.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|err| AuthError::Provider(format!("code exchange failed: {err}")))?;

        if !response.status().is_success() {
            error!("Provider rejected code exchange: {}", response.status());
            return Err(AuthError::Provider(format!(
                "code exchange rejected with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| AuthError::Provider(format!("malformed token response: {err}")))?;

        let profile: Profile = self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|err| AuthError::Provider(format!("profile fetch failed: {err}")))?
            .error_for_status()
            .map_err(|err| AuthError::Provider(format!("profile fetch rejected: {err}")))?
            .json()
            .await
            .map_err(|err| AuthError::Provider(format!("malformed profile: {err}")))?;

        debug!(subject = %profile.sub, "completed provider authorization");

        self.store.find_or_create_federated(&profile.sub).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confide::store::MemoryStore;
    use axum::extract::Form;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::json;
    use std::collections::HashMap;

    async fn spawn_provider_stub() -> String {
        let app = Router::new()
            .route(
                "/token",
                post(|Form(params): Form<HashMap<String, String>>| async move {
                    if params.get("code").map(String::as_str) == Some("good-code") {
                        Json(json!({"access_token": "at-1", "token_type": "Bearer"}))
                            .into_response()
                    } else {
                        (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"error": "invalid_grant"})),
                        )
                            .into_response()
                    }
                }),
            )
            .route(
                "/userinfo",
                get(|| async { Json(json!({"sub": "provider-sub-1"})) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config_for(base: &str) -> AuthConfig {
        AuthConfig::new(SecretString::from("test-secret"))
            .with_provider_client(
                "client-id".to_string(),
                SecretString::from("client-secret"),
                "http://localhost:3000/auth/provider/callback".to_string(),
            )
            .with_authorize_endpoint(format!("{base}/authorize"))
            .with_token_endpoint(format!("{base}/token"))
            .with_userinfo_endpoint(format!("{base}/userinfo"))
    }

    #[tokio::test]
    async fn authorize_url_carries_client_and_redirect() {
        let config = config_for("http://127.0.0.1:9");
        let strategy = FederatedStrategy::new(&config, Arc::new(MemoryStore::new())).unwrap();
        let url = strategy.authorize_url().unwrap();
        assert!(url.starts_with("http://127.0.0.1:9/authorize?"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid"));
    }

    #[tokio::test]
    async fn unconfigured_provider_is_rejected() {
        let config = AuthConfig::new(SecretString::from("test-secret"));
        let strategy = FederatedStrategy::new(&config, Arc::new(MemoryStore::new())).unwrap();
        assert!(matches!(
            strategy.authorize_url(),
            Err(AuthError::MisconfiguredProvider)
        ));
        assert!(matches!(
            strategy.complete("good-code").await,
            Err(AuthError::MisconfiguredProvider)
        ));
    }

    #[tokio::test]
    async fn complete_creates_account_on_first_login() {
        let base = spawn_provider_stub().await;
        let store = Arc::new(MemoryStore::new());
        let strategy = FederatedStrategy::new(&config_for(&base), store.clone()).unwrap();

        let user = strategy.complete("good-code").await.unwrap();
        assert_eq!(user.federated_id.as_deref(), Some("provider-sub-1"));
        assert!(user.password_hash.is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_callbacks_converge_on_one_account() {
        let base = spawn_provider_stub().await;
        let store = Arc::new(MemoryStore::new());
        let strategy =
            Arc::new(FederatedStrategy::new(&config_for(&base), store.clone()).unwrap());

        let first = strategy.clone();
        let second = strategy.clone();
        let (a, b) = tokio::join!(first.complete("good-code"), second.complete("good-code"));
        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn invalid_code_is_a_provider_error_and_creates_nothing() {
        let base = spawn_provider_stub().await;
        let store = Arc::new(MemoryStore::new());
        let strategy = FederatedStrategy::new(&config_for(&base), store.clone()).unwrap();

        let err = strategy.complete("bad-code").await.unwrap_err();
        assert!(matches!(err, AuthError::Provider(_)));
        assert!(store.is_empty());
    }
}
