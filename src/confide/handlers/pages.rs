//! Public landing and form pages.

use axum::response::{Html, IntoResponse};

use super::page;

pub async fn home() -> impl IntoResponse {
    Html(page(
        "Home",
        r#"<h1>Confide</h1>
<p>Share a secret with the world, anonymously.</p>
<p><a href="/register">Register</a> | <a href="/login">Login</a> | <a href="/secrets">Browse secrets</a></p>"#,
    ))
}

pub async fn register_form() -> impl IntoResponse {
    Html(page(
        "Register",
        r#"<h1>Register</h1>
<form action="/register" method="post">
  <label>Email <input type="email" name="username" required></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">Register</button>
</form>
<p><a href="/auth/provider">Sign up with your identity provider</a></p>"#,
    ))
}

pub async fn login_form() -> impl IntoResponse {
    Html(page(
        "Login",
        r#"<h1>Login</h1>
<form action="/login" method="post">
  <label>Email <input type="email" name="username" required></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">Login</button>
</form>
<p><a href="/auth/provider">Sign in with your identity provider</a></p>"#,
    ))
}
