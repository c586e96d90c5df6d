//! Federated login entry point and provider callback.

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};

use super::account::{establish_and_redirect, store_failure};
use crate::confide::error::AuthError;
use crate::confide::state::AppState;

#[derive(Deserialize, Debug)]
pub struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// `GET /auth/provider`: bounce the browser to the provider's authorization
/// endpoint.
pub async fn begin(state: Extension<Arc<AppState>>) -> impl IntoResponse {
    match state.federated().authorize_url() {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(AuthError::MisconfiguredProvider) => {
            warn!("Federated login requested but no provider is configured");
            Redirect::to("/login").into_response()
        }
        Err(err) => {
            error!("Failed to build authorization URL: {err}");
            Redirect::to("/login").into_response()
        }
    }
}

/// `GET /auth/provider/callback`: finish the code exchange and sign the user
/// in. Any provider-side failure lands back on the login page with no
/// credential state changed.
pub async fn callback(
    state: Extension<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    if let Some(provider_error) = query.error {
        warn!("Provider returned an error on callback: {provider_error}");
        return Redirect::to("/login").into_response();
    }
    let Some(code) = query.code else {
        return Redirect::to("/login").into_response();
    };

    match state.federated().complete(&code).await {
        Ok(user) => establish_and_redirect(&state, &user).await,
        Err(AuthError::Provider(reason)) => {
            error!("Federated login failed: {reason}");
            Redirect::to("/login").into_response()
        }
        Err(AuthError::MisconfiguredProvider) => {
            warn!("Callback received but no provider is configured");
            Redirect::to("/login").into_response()
        }
        Err(err) => store_failure(&err),
    }
}
