//! SQLite pool construction and schema migration.

use crate::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Schema, applied statement by statement inside one transaction.
///
/// `sessions.user_id` is `UNIQUE`: the store never holds two sessions for one user.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        session_id TEXT NOT NULL UNIQUE,
        expires_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
    "CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        category_id INTEGER NOT NULL REFERENCES categories(id),
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS reactions (
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        target_type TEXT NOT NULL CHECK (target_type IN ('post', 'comment')),
        target_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK (kind IN ('like', 'dislike')),
        created_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, target_type, target_id)
    )",
    // Reactions point at posts or comments without a foreign key; these clear them
    // when the target goes, including through a cascade from `users` or `posts`.
    "CREATE TRIGGER IF NOT EXISTS trg_posts_drop_reactions AFTER DELETE ON posts
     BEGIN
        DELETE FROM reactions WHERE target_type = 'post' AND target_id = OLD.id;
     END",
    "CREATE TRIGGER IF NOT EXISTS trg_comments_drop_reactions AFTER DELETE ON comments
     BEGIN
        DELETE FROM reactions WHERE target_type = 'comment' AND target_id = OLD.id;
     END",
    "INSERT OR IGNORE INTO categories (name, description) VALUES
        ('General', 'Anything goes'),
        ('Technology', 'Software, hardware and the internet'),
        ('Sports', 'Games, teams and results'),
        ('Entertainment', 'Film, music and television')",
];

/// Open a pool against the configured database, creating the file if needed.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the database cannot be opened.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
}

/// Open a private in-memory database with the schema applied.
///
/// The pool holds exactly one connection that is never recycled, since every
/// SQLite `:memory:` connection is a separate database.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Apply the schema. Idempotent.
///
/// # Errors
///
/// Returns an error if any statement fails; the whole migration is rolled back.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(statements = SCHEMA.len(), "Database schema up to date");
    Ok(())
}
