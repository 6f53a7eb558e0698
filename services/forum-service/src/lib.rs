//! Forum backend with session-backed token authentication.
//!
//! Every token refers to a server-side session row, and a user has at most one
//! session. Logging in again or logging out revokes all earlier tokens.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

// Re-export key types for convenience
pub use agents::SessionSweeperAgent;
pub use config::ForumServiceConfig;
pub use error::{ApiError, AuthError};
pub use routes::router;
pub use services::{
    AuthenticatedUser, Authenticator, Claims, IssuedToken, PasswordService, SessionStore,
    TokenService,
};
pub use state::AppState;
