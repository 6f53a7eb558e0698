//! Identity extractors.
//!
//! The auth gate stores an [`AuthenticatedUser`] in the request extensions; these
//! are the only ways handlers read it.
//!
//! ```rust,ignore
//! async fn create_post(CurrentUser(user): CurrentUser) -> String {
//!     format!("posting as {}", user.user_id)
//! }
//! ```

use crate::error::AuthError;
use crate::services::AuthenticatedUser;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Extensions},
};

/// The authenticated caller. Rejects with 401 if the auth gate did not run or
/// did not authenticate the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Self)
            .ok_or(AuthError::MissingCredentials)
    }
}

/// The caller if authenticated, `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

/// User id attached by the auth gate, if any.
#[must_use]
pub fn user_id_from_extensions(extensions: &Extensions) -> Option<i64> {
    extensions.get::<AuthenticatedUser>().map(|user| user.user_id)
}
