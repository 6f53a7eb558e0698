//! Authenticator: ties tokens to live sessions.
//!
//! A token is accepted only when its signature and expiry check out *and* the
//! session it names is still the user's live session. Logging in again replaces
//! the session, so every earlier token stops working.

use crate::error::AuthError;
use crate::models::Session;
use crate::services::{Claims, SessionStore, TokenService};
use std::sync::Arc;

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Authenticated user id.
    pub user_id: i64,
    /// Session the credential was validated against.
    pub session_id: String,
}

/// A freshly minted token together with the session it references.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Signed token for the client.
    pub token: String,
    /// The session now live for the user.
    pub session: Session,
}

/// Session-backed token authenticator.
#[derive(Debug, Clone)]
pub struct Authenticator {
    sessions: SessionStore,
    tokens: Arc<TokenService>,
}

impl Authenticator {
    /// Create an authenticator over a session store and token signer.
    #[must_use]
    pub fn new(sessions: SessionStore, tokens: TokenService) -> Self {
        Self {
            sessions,
            tokens: Arc::new(tokens),
        }
    }

    /// Underlying session store.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Start a new session for `user_id` (replacing any previous one) and mint a
    /// token for it. The token expires with the session.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidUser`] or [`AuthError::StoreUnavailable`] from the
    /// store, [`AuthError::Signing`] if signing fails.
    pub async fn generate_token(&self, user_id: i64) -> Result<IssuedToken, AuthError> {
        let session = self.sessions.create_session(user_id).await?;
        let token = self
            .tokens
            .issue(user_id, &session.session_id, session.expires_at)?;

        tracing::info!(user_id, "Issued token");
        Ok(IssuedToken { token, session })
    }

    /// Check a token's signature and expiry only. Does not touch the store.
    ///
    /// # Errors
    ///
    /// Any token error from [`TokenService::verify`].
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.verify(token)
    }

    /// Fully authenticate a presented token.
    ///
    /// # Errors
    ///
    /// Token errors, [`AuthError::SessionNotFound`] if the referenced session is
    /// not live or belongs to someone else, [`AuthError::StoreUnavailable`] on
    /// storage failure.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.validate_token(token)?;
        let session = self.sessions.validate_session(&claims.sid).await?;

        if session.user_id != claims.sub {
            tracing::warn!(
                claimed = claims.sub,
                owner = session.user_id,
                "Token subject does not own referenced session"
            );
            return Err(AuthError::SessionNotFound);
        }

        Ok(AuthenticatedUser {
            user_id: session.user_id,
            session_id: session.session_id,
        })
    }

    /// End the user's session. Idempotent.
    ///
    /// # Errors
    ///
    /// [`AuthError::StoreUnavailable`] on storage failure.
    pub async fn logout(&self, user_id: i64) -> Result<(), AuthError> {
        let removed = self.sessions.invalidate_session(user_id).await?;
        tracing::info!(user_id, removed, "Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, Utc};
    use sqlx::SqlitePool;

    async fn setup() -> (Authenticator, SqlitePool, i64) {
        let pool = db::connect_in_memory().await.unwrap();
        let user_id = insert_user(&pool, "alice").await;
        let auth = Authenticator::new(
            SessionStore::new(pool.clone()),
            TokenService::new("unit-test-key").unwrap(),
        );
        (auth, pool, user_id)
    }

    async fn insert_user(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?, ?, 'x', 0) RETURNING id",
        )
        .bind(name)
        .bind(format!("{name}@example.com"))
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_and_authenticate() {
        let (auth, _pool, user_id) = setup().await;

        let issued = auth.generate_token(user_id).await.unwrap();
        let user = auth.authenticate(&issued.token).await.unwrap();

        assert_eq!(user.user_id, user_id);
        assert_eq!(user.session_id, issued.session.session_id);

        let claims = auth.validate_token(&issued.token).unwrap();
        assert_eq!(claims.exp, issued.session.expires_at.timestamp());
    }

    #[tokio::test]
    async fn test_second_login_revokes_first_token() {
        let (auth, _pool, user_id) = setup().await;

        let first = auth.generate_token(user_id).await.unwrap();
        let second = auth.generate_token(user_id).await.unwrap();

        // Still signed and unexpired, but no longer live
        assert!(auth.validate_token(&first.token).is_ok());
        assert!(matches!(
            auth.authenticate(&first.token).await,
            Err(AuthError::SessionNotFound)
        ));
        assert!(auth.authenticate(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let (auth, _pool, user_id) = setup().await;

        let issued = auth.generate_token(user_id).await.unwrap();
        auth.logout(user_id).await.unwrap();
        auth.logout(user_id).await.unwrap();

        assert!(matches!(
            auth.authenticate(&issued.token).await,
            Err(AuthError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_sessions_of_other_users_unaffected() {
        let (auth, pool, alice) = setup().await;
        let bob = insert_user(&pool, "bob").await;

        let alice_token = auth.generate_token(alice).await.unwrap().token;
        let bob_token = auth.generate_token(bob).await.unwrap().token;
        auth.logout(bob).await.unwrap();

        assert!(auth.authenticate(&alice_token).await.is_ok());
        assert!(auth.authenticate(&bob_token).await.is_err());
    }

    #[tokio::test]
    async fn test_subject_must_own_session() {
        let (auth, pool, alice) = setup().await;
        let bob = insert_user(&pool, "bob").await;

        let alice_session = auth.generate_token(alice).await.unwrap().session;
        let forged = auth
            .tokens
            .issue(bob, &alice_session.session_id, alice_session.expires_at)
            .unwrap();

        assert!(matches!(
            auth.authenticate(&forged).await,
            Err(AuthError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected_before_store() {
        let (auth, _pool, user_id) = setup().await;
        let session = auth.sessions().create_session(user_id).await.unwrap();
        let token = auth
            .tokens
            .issue(user_id, &session.session_id, Utc::now() - Duration::seconds(1))
            .unwrap();

        assert!(matches!(
            auth.authenticate(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_token_from_other_key_rejected() {
        let (auth, _pool, user_id) = setup().await;
        let session = auth.sessions().create_session(user_id).await.unwrap();
        let foreign = TokenService::new("someone-else")
            .unwrap()
            .issue(user_id, &session.session_id, session.expires_at)
            .unwrap();

        assert!(matches!(
            auth.authenticate(&foreign).await,
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn test_invalid_user_rejected() {
        let (auth, _pool, _) = setup().await;
        assert!(matches!(
            auth.generate_token(0).await,
            Err(AuthError::InvalidUser)
        ));
    }
}
