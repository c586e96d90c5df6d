//! # Confide
//!
//! `confide` is a small secret-sharing web application. Visitors register a
//! local account (email + password) or sign in through an external OAuth2
//! identity provider, and once authenticated may store a single free-text
//! secret. All stored secrets are listed anonymously on a public page.
//!
//! ## Authentication
//!
//! - **Local:** passwords are hashed with Argon2id; only the PHC string is
//!   stored. Verification is delegated to the `argon2` crate, which compares
//!   in constant time.
//! - **Federated:** OAuth2 authorization-code flow. The provider-scoped
//!   subject id is mapped to a local account with find-or-create semantics,
//!   so duplicate callbacks converge on a single record.
//!
//! ## Sessions
//!
//! Sessions are server-held state keyed by a keyed hash of an opaque random
//! token carried in an `HttpOnly` cookie. Only the user id is serialized into
//! session state. Sessions expire after a configurable idle timeout, and a
//! stale or tampered cookie degrades to an anonymous request rather than an
//! error.

pub mod cli;
pub mod confide;
