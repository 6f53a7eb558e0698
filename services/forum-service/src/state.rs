//! Shared application state.

use crate::config::ForumServiceConfig;
use crate::error::AuthError;
use crate::services::{
    Authenticator, ForumRepository, PasswordService, SessionStore, TokenService, UserRepository,
};
use rand::{distr::Alphanumeric, Rng};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Length of the random secret behind the decoy verifier.
const DECOY_SECRET_LEN: usize = 32;

/// Token cookie attributes.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Cookie name.
    pub name: String,
    /// Add the `Secure` attribute.
    pub secure: bool,
}

/// Application state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pool: SqlitePool,
    users: UserRepository,
    forum: ForumRepository,
    passwords: PasswordService,
    decoy_verifier: Arc<str>,
    authenticator: Authenticator,
    cookie: CookieSettings,
}

impl AppState {
    /// Build state over `pool` from configuration and a ready token signer.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if the password parameters are invalid.
    pub fn new(
        pool: SqlitePool,
        config: &ForumServiceConfig,
        tokens: TokenService,
    ) -> Result<Self, AuthError> {
        let sessions = SessionStore::with_ttl_seconds(pool.clone(), config.session.ttl_seconds);
        let passwords = PasswordService::from_config(&config.password)?;

        let decoy_secret: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(DECOY_SECRET_LEN)
            .map(char::from)
            .collect();
        let decoy_verifier: Arc<str> = Arc::from(passwords.hash(&decoy_secret)?);

        Ok(Self {
            users: UserRepository::new(pool.clone()),
            forum: ForumRepository::new(pool.clone()),
            passwords,
            decoy_verifier,
            authenticator: Authenticator::new(sessions, tokens),
            cookie: CookieSettings {
                name: config.auth.cookie_name.clone(),
                secure: config.auth.secure_cookie,
            },
            pool,
        })
    }

    /// Database pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// User repository.
    #[must_use]
    pub const fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Forum content repository.
    #[must_use]
    pub const fn forum(&self) -> &ForumRepository {
        &self.forum
    }

    /// Password hasher.
    #[must_use]
    pub const fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    /// Verifier for a secret nobody knows, hashed with the live parameters.
    ///
    /// Login checks unknown emails against it so both failure paths pay the same
    /// hashing cost.
    #[must_use]
    pub fn decoy_verifier(&self) -> &str {
        &self.decoy_verifier
    }

    /// Token authenticator.
    #[must_use]
    pub const fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Token cookie attributes.
    #[must_use]
    pub const fn cookie(&self) -> &CookieSettings {
        &self.cookie
    }
}
