use anyhow::Result;
use secrecy::SecretString;
use tracing::warn;

use crate::confide::{self, state::AuthConfig};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_secret: String,
    pub session_ttl_seconds: u64,
    pub secure_cookies: bool,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub oauth_redirect_url: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store connection or the server itself fails.
pub async fn execute(args: Args) -> Result<()> {
    let mut config = AuthConfig::new(SecretString::from(args.session_secret))
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_cookie_secure(args.secure_cookies);

    // Federated login is optional; it needs the full client triple.
    match (
        args.oauth_client_id,
        args.oauth_client_secret,
        args.oauth_redirect_url,
    ) {
        (Some(id), Some(secret), Some(redirect)) => {
            config = config.with_provider_client(id, SecretString::from(secret), redirect);
        }
        (None, None, None) => {}
        _ => {
            warn!("Partial provider configuration ignored; federated login disabled");
        }
    }

    confide::new(args.port, args.dsn, config).await
}
