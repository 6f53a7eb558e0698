//! Axum extractors.

pub mod auth;

pub use auth::{user_id_from_extensions, CurrentUser, MaybeUser};
