//! Public secret listing and the authenticated submission flow.

use axum::{
    extract::{Extension, Form},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use super::{authenticate_session, escape_html, page};
use crate::confide::state::AppState;

#[derive(Deserialize, Debug)]
pub struct SecretForm {
    secret: String,
}

/// `GET /secrets`: public, anonymous listing of every stored secret. The
/// listing carries secret text only; credential material never reaches this
/// handler.
pub async fn list(state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let secrets = match state.store().list_secrets().await {
        Ok(secrets) => secrets,
        Err(err) => {
            error!("Failed to list secrets: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut body = String::from("<h1>Secrets people have shared</h1>\n<ul>\n");
    for secret in &secrets {
        body.push_str("  <li>");
        body.push_str(&escape_html(secret));
        body.push_str("</li>\n");
    }
    body.push_str("</ul>\n<p><a href=\"/submit\">Share your own</a> | <a href=\"/logout\">Logout</a></p>");

    Html(page("Secrets", &body)).into_response()
}

/// `GET /submit`: authenticated-only form. An anonymous visitor is redirected
/// to the login page; that is a normal flow, not an error.
pub async fn submit_form(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    match authenticate_session(&headers, &state).await {
        Ok(Some(_user)) => Html(page(
            "Submit",
            r#"<h1>Share a secret</h1>
<form action="/submit" method="post">
  <label>Your secret <input type="text" name="secret" required></label>
  <button type="submit">Submit</button>
</form>"#,
        ))
        .into_response(),
        Ok(None) => Redirect::to("/login").into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// `POST /submit`: overwrite the current user's secret.
pub async fn submit(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Form(form): Form<SecretForm>,
) -> impl IntoResponse {
    let user = match authenticate_session(&headers, &state).await {
        Ok(Some(user)) => user,
        Ok(None) => return Redirect::to("/login").into_response(),
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    match state.store().set_secret(user.id, &form.secret).await {
        Ok(()) => Redirect::to("/secrets").into_response(),
        Err(err) => {
            error!("Failed to store secret: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
