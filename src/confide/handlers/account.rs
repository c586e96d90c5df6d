//! Local registration, login, and logout.

use axum::{
    extract::{Extension, Form},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

use super::{clear_session_cookie, extract_session_token, session_cookie, valid_email};
use crate::confide::error::AuthError;
use crate::confide::state::AppState;
use crate::confide::store::User;

#[derive(Deserialize, Debug)]
pub struct Credentials {
    username: String,
    password: String,
}

pub async fn register(
    state: Extension<Arc<AppState>>,
    Form(credentials): Form<Credentials>,
) -> impl IntoResponse {
    if !valid_email(&credentials.username) {
        return Redirect::to("/register").into_response();
    }

    match state
        .local()
        .register(&credentials.username, &credentials.password)
        .await
    {
        Ok(user) => establish_and_redirect(&state, &user).await,
        // An existing account is an expected user condition; back to the form.
        Err(AuthError::DuplicateIdentifier) => {
            debug!("registration rejected: identifier already taken");
            Redirect::to("/register").into_response()
        }
        Err(err) => store_failure(&err),
    }
}

pub async fn login(
    state: Extension<Arc<AppState>>,
    Form(credentials): Form<Credentials>,
) -> impl IntoResponse {
    // Verify the password first; the session is only established for a
    // proven identity.
    match state
        .local()
        .authenticate(&credentials.username, &credentials.password)
        .await
    {
        Ok(user) => establish_and_redirect(&state, &user).await,
        Err(AuthError::NotFound | AuthError::InvalidCredential) => {
            debug!("login rejected");
            Redirect::to("/login").into_response()
        }
        Err(err) => store_failure(&err),
    }
}

pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        state.sessions().terminate(&token).await;
    }

    // Always clear the cookie, even when no session state existed.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (response_headers, Redirect::to("/")).into_response()
}

/// Shared success path for every authentication flow: establish the session,
/// set the cookie, and land on the secrets page.
pub(super) async fn establish_and_redirect(
    state: &AppState,
    user: &User,
) -> axum::response::Response {
    let token = match state.sessions().establish(user).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to establish session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut headers = HeaderMap::new();
    match session_cookie(state.config(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    (headers, Redirect::to("/secrets")).into_response()
}

/// Infrastructure failures surface as a generic 500; no retries here.
pub(super) fn store_failure(err: &AuthError) -> axum::response::Response {
    error!("Credential store failure: {err}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
