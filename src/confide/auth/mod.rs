//! Authentication strategies and the session layer.
//!
//! The route controller only ever talks to these three types; how an
//! identity was proven (password hash vs. provider callback) stays behind
//! them.

pub mod federated;
pub mod local;
pub mod session;

pub use federated::FederatedStrategy;
pub use local::LocalStrategy;
pub use session::SessionManager;
