//! HTTP middleware.

pub mod auth;

pub use auth::{extract_token, protect_route, AuthLayer, AuthMiddleware, AuthPolicy, TOKEN_COOKIE_NAME};
