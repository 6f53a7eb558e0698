//! Forum service binary entry point.

use acton_reactive::prelude::ActonApp;
use forum_service::{db, AppState, ForumServiceConfig, SessionSweeperAgent, TokenService};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting forum-service");

    // Load configuration
    let config = ForumServiceConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", *e);
        ForumServiceConfig::default()
    });

    let tokens = if config.auth.secret_key.is_empty() {
        tracing::warn!(
            "No auth.secret_key configured; using a random key. Tokens will not survive a restart"
        );
        TokenService::with_random_key()
    } else {
        TokenService::new(&config.auth.secret_key)?
    };

    // Open database and apply schema
    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;

    let state = AppState::new(pool, &config, tokens)?;

    // Initialize acton-reactive runtime
    let mut runtime = ActonApp::launch();

    // Spawn session sweeper agent
    let _sweeper = SessionSweeperAgent::spawn(
        &mut runtime,
        state.authenticator().sessions().clone(),
        config.session.cleanup_interval_seconds,
    )
    .await?;

    let app = forum_service::router(state);

    // Build server address
    let addr: SocketAddr = format!("{}:{}", config.service.host, config.service.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // Shutdown runtime
    runtime.shutdown_all().await?;

    Ok(())
}
