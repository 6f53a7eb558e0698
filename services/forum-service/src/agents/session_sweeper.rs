//! Session sweeper agent.
//!
//! Periodically deletes expired rows from the session store. Validation already
//! ignores expired rows, so the sweep only bounds table growth; it never changes
//! who is authenticated.

use crate::services::SessionStore;
use acton_reactive::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};

/// Type alias for response channels (cloneable for actor message requirements).
pub type ResponseChannel<T> = Arc<Mutex<Option<oneshot::Sender<T>>>>;

/// Create a request-reply pair.
#[must_use]
pub fn create_request_reply<T>() -> (ResponseChannel<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (Arc::new(Mutex::new(Some(tx))), rx)
}

/// Send a response through a response channel.
///
/// # Errors
///
/// Returns the value if the receiver was dropped.
pub async fn send_response<T>(response_tx: ResponseChannel<T>, value: T) -> Result<(), T> {
    let tx = response_tx.lock().await.take();
    if let Some(tx) = tx {
        tx.send(value)
    } else {
        Err(value)
    }
}

/// Sweeper agent state.
#[derive(Debug, Default)]
pub struct SessionSweeperAgent {
    /// Store to sweep. `None` only before [`Self::spawn`] fills it in.
    store: Option<SessionStore>,
}

impl SessionSweeperAgent {
    /// Spawn the sweeper and its periodic trigger.
    ///
    /// An interval of zero is treated as one second.
    ///
    /// # Errors
    ///
    /// Returns error if agent initialization fails.
    pub async fn spawn(
        runtime: &mut ActorRuntime,
        store: SessionStore,
        interval_secs: u64,
    ) -> anyhow::Result<ActorHandle> {
        let config = ActorConfig::new(Ern::with_root("session_sweeper")?, None);
        let mut builder = runtime.new_actor_with_config::<Self>(config);
        builder.model = Self { store: Some(store) };

        Self::configure_handlers(&mut builder);

        let handle = builder.start().await;
        Self::spawn_sweep_task(handle.clone(), interval_secs.max(1));
        tracing::info!(interval_secs, "Session sweeper started");
        Ok(handle)
    }

    fn configure_handlers(builder: &mut ManagedActor<Idle, Self>) {
        builder.mutate_on::<SweepExpired>(|agent, ctx| {
            let store = agent.model.store.clone();
            let response_tx = ctx.message().response_tx.clone();
            Reply::pending(async move {
                let removed = match store {
                    Some(store) => sweep(&store).await,
                    None => 0,
                };
                send_optional_response(response_tx, removed).await;
            })
        });
    }

    /// Spawn the periodic sweep background task.
    fn spawn_sweep_task(handle: ActorHandle, interval_secs: u64) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                handle.send(SweepExpired::default()).await;
            }
        });
    }
}

/// Run one sweep. Failures are logged and count as zero removed.
async fn sweep(store: &SessionStore) -> u64 {
    match store.sweep_expired().await {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(removed, "Swept expired sessions");
            } else {
                tracing::debug!("No expired sessions to sweep");
            }
            removed
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session sweep failed");
            0
        }
    }
}

/// Send a response if a response channel is provided.
async fn send_optional_response<T>(response_tx: Option<ResponseChannel<T>>, value: T) {
    if let Some(tx) = response_tx {
        let _ = send_response(tx, value).await;
    }
}

/// Trigger a sweep of expired sessions.
#[derive(Clone, Debug, Default)]
pub struct SweepExpired {
    /// Receives the number of sessions removed.
    pub response_tx: Option<ResponseChannel<u64>>,
}

impl SweepExpired {
    /// Create a sweep request with response channel.
    #[must_use]
    pub fn with_response() -> (Self, oneshot::Receiver<u64>) {
        let (response_tx, rx) = create_request_reply();
        let request = Self {
            response_tx: Some(response_tx),
        };
        (request, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use acton_reactive::prelude::ActorHandleInterface;
    use chrono::Utc;
    use sqlx::SqlitePool;

    async fn seed(pool: &SqlitePool, name: &str, expires_at: i64) {
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?, ?, 'x', 0) RETURNING id",
        )
        .bind(name)
        .bind(format!("{name}@example.com"))
        .fetch_one(pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO sessions (user_id, session_id, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(format!("sid-{name}"))
            .bind(expires_at)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sweep_removes_only_expired() {
        let pool = db::connect_in_memory().await.unwrap();
        let now = Utc::now().timestamp();
        seed(&pool, "stale", now - 10).await;
        seed(&pool, "fresh", now + 3600).await;

        let mut runtime = ActonApp::launch_async().await;
        let agent = SessionSweeperAgent::spawn(&mut runtime, SessionStore::new(pool.clone()), 3600)
            .await
            .unwrap();

        let (request, rx) = SweepExpired::with_response();
        agent.send(request).await;

        let removed = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("Timeout")
            .expect("Channel closed");
        assert_eq!(removed, 1);

        let remaining: Vec<String> = sqlx::query_scalar("SELECT session_id FROM sessions")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, vec!["sid-fresh".to_string()]);

        runtime.shutdown_all().await.expect("Failed to shutdown");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sweep_with_nothing_expired() {
        let pool = db::connect_in_memory().await.unwrap();

        let mut runtime = ActonApp::launch_async().await;
        let agent = SessionSweeperAgent::spawn(&mut runtime, SessionStore::new(pool), 3600)
            .await
            .unwrap();

        let (request, rx) = SweepExpired::with_response();
        agent.send(request).await;

        let removed = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("Timeout")
            .expect("Channel closed");
        assert_eq!(removed, 0);

        runtime.shutdown_all().await.expect("Failed to shutdown");
    }
}
