//! User accounts.

use crate::error::{is_unique_violation, ApiError};
use crate::models::User;
use chrono::Utc;
use sqlx::SqlitePool;

/// SQLite-backed user repository.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new account. `password_hash` must already be a verifier.
    ///
    /// # Errors
    ///
    /// [`ApiError::Conflict`] if the username or email is taken,
    /// [`ApiError::Database`] otherwise.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                tracing::info!(user_id = user.id, "User registered");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(ApiError::Conflict(
                "username or email already registered".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up by login email.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Look up by id.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete an account and, through cascades, everything it owns.
    ///
    /// # Errors
    ///
    /// Returns the database error on failure.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let removed = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }
}
