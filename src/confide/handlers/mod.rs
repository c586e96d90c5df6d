pub mod account;
pub mod health;
pub mod oauth;
pub mod pages;
pub mod secrets;


// common helpers for the handlers
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use regex::Regex;
use tracing::error;

use crate::confide::error::AuthError;
use crate::confide::state::{AppState, AuthConfig};
use crate::confide::store::User;

const SESSION_COOKIE_NAME: &str = "confide_session";

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Resolve the session cookie into the current user, if any.
///
/// `Ok(None)` covers every anonymous case: missing cookie, unknown or
/// expired token, and a session whose user was removed out-of-band. Only a
/// store failure is an error.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Option<User>, AuthError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let Some(user_id) = state.sessions().resolve(&token).await else {
        return Ok(None);
    };
    match state.store().find_by_id(user_id).await {
        Ok(user) => Ok(user),
        Err(err) => {
            error!("Failed to load session user: {err}");
            Err(err)
        }
    }
}

/// Build a secure `HttpOnly` cookie carrying the session token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

/// Escape user text for interpolation into HTML bodies.
pub(super) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Minimal shared page shell; templating proper is out of scope.
pub(super) fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title} - Confide</title></head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_garbage() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("a b@example.com"));
    }

    #[test]
    fn extract_session_token_finds_our_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; confide_session=tok123; lang=en"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn extract_session_token_ignores_empty_and_missing_values() {
        let mut headers = HeaderMap::new();
        assert!(extract_session_token(&headers).is_none());
        headers.insert(COOKIE, HeaderValue::from_static("confide_session="));
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn session_cookie_is_http_only_and_scoped_to_root() {
        use secrecy::SecretString;
        let config = crate::confide::state::AuthConfig::new(SecretString::from("s"))
            .with_session_ttl_seconds(60);
        let cookie = session_cookie(&config, "tok").unwrap();
        let value = cookie.to_str().unwrap();
        assert!(value.contains("confide_session=tok"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=60"));
        assert!(!value.contains("Secure"));

        let secure = crate::confide::state::AuthConfig::new(SecretString::from("s"))
            .with_session_cookie_secure(true);
        let cookie = session_cookie(&secure, "tok").unwrap();
        assert!(cookie.to_str().unwrap().contains("Secure"));
    }
}
