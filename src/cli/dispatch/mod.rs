use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(3000);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let session_secret = matches
        .get_one::<String>("session-secret")
        .cloned()
        .context("missing required argument: --session-secret")?;
    let session_ttl_seconds = matches
        .get_one::<u64>("session-ttl")
        .copied()
        .unwrap_or(43200);
    let secure_cookies = matches.get_flag("secure-cookies");

    let oauth_client_id = matches.get_one::<String>("oauth-client-id").cloned();
    let oauth_client_secret = matches.get_one::<String>("oauth-client-secret").cloned();
    let oauth_redirect_url = matches.get_one::<String>("oauth-redirect-url").cloned();

    Ok(Action::Server(Args {
        port,
        dsn,
        session_secret,
        session_ttl_seconds,
        secure_cookies,
        oauth_client_id,
        oauth_client_secret,
        oauth_redirect_url,
    }))
}
