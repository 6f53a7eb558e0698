//! Session store: at most one live session per user, backed by SQLite.
//!
//! The `sessions` table is the source of truth for authentication. A token is only
//! a signed reference to a row here; once the row is gone (logout, replacement by a
//! newer login, sweep) every token pointing at it stops working.

use crate::error::AuthError;
use crate::models::{from_unix, Session};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;

/// Bytes of randomness in a session identifier.
const SESSION_ID_BYTES: usize = 32;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 86400;

/// Upper bound on a configured lifetime (ten years).
const MAX_SESSION_TTL_SECONDS: i64 = 10 * 365 * 86400;

/// SQLite-backed session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: SqlitePool,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store with the default 24 hour TTL.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_ttl_seconds(pool, DEFAULT_SESSION_TTL_SECONDS)
    }

    /// Create a store with a custom TTL.
    #[must_use]
    pub fn with_ttl_seconds(pool: SqlitePool, ttl_seconds: u64) -> Self {
        let secs = i64::try_from(ttl_seconds).map_or(MAX_SESSION_TTL_SECONDS, |s| {
            s.min(MAX_SESSION_TTL_SECONDS)
        });
        let ttl = Duration::seconds(secs);
        Self { pool, ttl }
    }

    /// Configured session lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh session for `user_id`, replacing any existing one.
    ///
    /// Delete and insert run in one transaction, so concurrent logins for the same
    /// user always leave exactly one row (the last to commit).
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidUser`] for a non-positive id,
    /// [`AuthError::StoreUnavailable`] if the transaction fails.
    pub async fn create_session(&self, user_id: i64) -> Result<Session, AuthError> {
        if user_id <= 0 {
            return Err(AuthError::InvalidUser);
        }

        let session = Session {
            user_id,
            session_id: generate_session_id(),
            expires_at: from_unix((Utc::now() + self.ttl).timestamp()),
        };

        let mut tx = self.pool.begin().await?;

        let replaced = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("INSERT INTO sessions (user_id, session_id, expires_at) VALUES (?, ?, ?)")
            .bind(session.user_id)
            .bind(&session.session_id)
            .bind(session.expires_at.timestamp())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(user_id, replaced, "Session created");
        Ok(session)
    }

    /// Look up a live session by identifier.
    ///
    /// Unknown, expired and superseded identifiers all yield the same
    /// [`AuthError::SessionNotFound`].
    ///
    /// # Errors
    ///
    /// [`AuthError::SessionNotFound`] as above, [`AuthError::StoreUnavailable`] on
    /// storage failure.
    pub async fn validate_session(&self, session_id: &str) -> Result<Session, AuthError> {
        if session_id.is_empty() {
            return Err(AuthError::SessionNotFound);
        }

        let row: Option<(i64, String, i64)> = sqlx::query_as(
            "SELECT user_id, session_id, expires_at FROM sessions
             WHERE session_id = ? AND expires_at > ?",
        )
        .bind(session_id)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_session).ok_or(AuthError::SessionNotFound)
    }

    /// The user's live session, if any.
    ///
    /// # Errors
    ///
    /// [`AuthError::StoreUnavailable`] on storage failure.
    pub async fn active_session_for_user(&self, user_id: i64) -> Result<Option<Session>, AuthError> {
        let row: Option<(i64, String, i64)> = sqlx::query_as(
            "SELECT user_id, session_id, expires_at FROM sessions
             WHERE user_id = ? AND expires_at > ?",
        )
        .bind(user_id)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_session))
    }

    /// Delete the user's session (logout). Idempotent.
    ///
    /// Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// [`AuthError::StoreUnavailable`] on storage failure.
    pub async fn invalidate_session(&self, user_id: i64) -> Result<bool, AuthError> {
        let removed = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!(user_id, removed, "Session invalidated");
        Ok(removed > 0)
    }

    /// Delete every session whose expiry has passed. Returns the number removed.
    ///
    /// # Errors
    ///
    /// [`AuthError::StoreUnavailable`] on storage failure.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let removed = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed)
    }
}

fn into_session((user_id, session_id, expires_at): (i64, String, i64)) -> Session {
    Session {
        user_id,
        session_id,
        expires_at: from_unix(expires_at),
    }
}

/// 256 bits from the thread-local CSPRNG, URL-safe base64 without padding.
fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
