//! Error types for authentication and the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Authentication and session failures.
///
/// Every variant except [`AuthError::StoreUnavailable`], [`AuthError::Hashing`] and
/// [`AuthError::Signing`] renders as the same `401 Unauthorized` body, so a caller
/// can never learn which check failed. The specific kind is only visible in logs.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Login with an unknown email or a wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No bearer header and no token cookie on the request.
    #[error("missing credentials")]
    MissingCredentials,

    /// Token is not `payload.signature` or its parts do not decode.
    #[error("malformed token")]
    TokenMalformed,

    /// Token signature does not match the server key.
    #[error("invalid token signature")]
    TokenSignatureInvalid,

    /// Token expiry is in the past.
    #[error("token expired")]
    TokenExpired,

    /// Session is absent, expired, or superseded by a newer login.
    #[error("session not found")]
    SessionNotFound,

    /// A non-positive user id was passed to the session store.
    #[error("invalid user id")]
    InvalidUser,

    /// The password hasher failed (not a verification mismatch).
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The token signer has an unusable key or could not encode claims.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// The backing store could not be reached or rejected the statement.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl AuthError {
    /// True for failures that are the caller's fault and map to 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        !matches!(
            self,
            Self::StoreUnavailable(_) | Self::Hashing(_) | Self::Signing(_)
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_unauthorized() {
            tracing::debug!(reason = %self, "Request rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response()
        } else {
            tracing::error!(error = %self, "Auth internal error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

/// Handler-level errors for the JSON API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body failed validation.
    #[error("{0}")]
    Validation(String),

    /// Unique constraint hit (duplicate username or email).
    #[error("{0}")]
    Conflict(String),

    /// Authenticated caller does not own the resource.
    #[error("forbidden")]
    Forbidden,

    /// Referenced row does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Authentication failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Database failure outside the auth path.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Anything else that is not the caller's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
                })
            })
            .next()
            .unwrap_or_else(|| "invalid request".to_string());
        Self::Validation(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        match self {
            Self::Auth(auth) => auth.into_response(),
            Self::Database(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (status, Json(json!({ "error": "internal error" }))).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

/// True if the error is a SQLite unique-constraint violation.
#[must_use]
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}
