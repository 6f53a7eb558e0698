//! Registration, login, logout and account handlers.

use crate::error::{ApiError, AuthError};
use crate::extractors::CurrentUser;
use crate::models::{User, UserProfile};
use crate::services::IssuedToken;
use crate::state::{AppState, CookieSettings};
use axum::{
    extract::State,
    http::{
        header::{AUTHORIZATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Characters that count as "special" in a password.
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Registration form.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name.
    #[validate(
        length(min = 3, max = 50, message = "username must be 3-50 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    /// Login email.
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    /// Plaintext password.
    #[validate(
        length(min = 8, max = 72, message = "password must be 8-72 characters"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
}

/// Login form.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login email.
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    /// Plaintext password.
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Body returned by register and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token.
    pub token: String,
    /// Authenticated user.
    pub user_id: i64,
    /// Token and session expiry, unix seconds.
    pub expires_at: i64,
    /// Human readable status.
    pub message: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(validation_error(
            "username_charset",
            "username may only contain letters, digits and underscores",
        ))
    }
}

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if upper && lower && digit && special {
        Ok(())
    } else {
        Err(validation_error(
            "password_strength",
            "password needs an uppercase letter, a lowercase letter, a digit and a special character",
        ))
    }
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// `POST /api/auth/register`
///
/// # Errors
///
/// 400 on validation failure, 409 on a duplicate username or email.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let password_hash = state.passwords().hash_blocking(request.password).await?;
    let user = state
        .users()
        .create(&request.username, &request.email, &password_hash)
        .await?;

    let issued = state.authenticator().generate_token(user.id).await?;
    let mut headers = token_headers(state.cookie(), &issued);
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", issued.token)) {
        headers.insert(AUTHORIZATION, value);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(auth_response(issued, "registration successful")),
    )
        .into_response())
}

/// `POST /api/auth/login`
///
/// # Errors
///
/// 400 on an empty field, 401 on unknown email or wrong password.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let user = state.users().find_by_email(&request.email).await?;
    let verifier = login_verifier(&state, user.as_ref());
    let matched = state
        .passwords()
        .verify_blocking(request.password, verifier)
        .await;

    let user = match user {
        Some(user) if matched => user,
        Some(user) => {
            tracing::debug!(user_id = user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }
        None => {
            tracing::debug!("Login for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let issued = state.authenticator().generate_token(user.id).await?;
    let headers = token_headers(state.cookie(), &issued);

    Ok((headers, Json(auth_response(issued, "login successful"))).into_response())
}

/// `POST /api/auth/logout`
///
/// # Errors
///
/// 500 if the session store is unavailable.
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ApiError> {
    state.authenticator().logout(user.user_id).await?;
    Ok((StatusCode::NO_CONTENT, cleared_cookie(state.cookie())).into_response())
}

/// `GET /api/auth/me`
///
/// # Errors
///
/// 404 if the account was deleted concurrently.
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .users()
        .find_by_id(user.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}

/// `DELETE /api/auth/me`
///
/// Removes the account together with its session, posts, comments and reactions.
///
/// # Errors
///
/// 404 if the account is already gone.
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ApiError> {
    if !state.users().delete(user.user_id).await? {
        return Err(ApiError::NotFound("user"));
    }
    tracing::info!(user_id = user.user_id, "Account deleted");
    Ok((StatusCode::NO_CONTENT, cleared_cookie(state.cookie())).into_response())
}

/// Verifier a login attempt is checked against. Unknown emails get the decoy.
fn login_verifier(state: &AppState, user: Option<&User>) -> String {
    user.map_or_else(
        || state.decoy_verifier().to_string(),
        |user| user.password_hash.clone(),
    )
}

fn auth_response(issued: IssuedToken, message: &str) -> AuthResponse {
    AuthResponse {
        token: issued.token,
        user_id: issued.session.user_id,
        expires_at: issued.session.expires_at.timestamp(),
        message: message.to_string(),
    }
}

/// `Set-Cookie` carrying the token for browser clients.
fn token_headers(settings: &CookieSettings, issued: &IssuedToken) -> HeaderMap {
    let max_age = (issued.session.expires_at.timestamp() - Utc::now().timestamp()).max(0);
    set_cookie(settings, &issued.token, max_age)
}

fn cleared_cookie(settings: &CookieSettings) -> HeaderMap {
    set_cookie(settings, "", 0)
}

fn set_cookie(settings: &CookieSettings, value: &str, max_age: i64) -> HeaderMap {
    let mut cookie = format!(
        "{}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax",
        settings.name
    );
    if settings.secure {
        cookie.push_str("; Secure");
    }

    let mut headers = HeaderMap::new();
    if let Ok(header_value) = cookie.parse() {
        headers.insert(SET_COOKIE, header_value);
    }
    headers
}
