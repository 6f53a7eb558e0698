//! HTTP request handlers.

pub mod auth;
pub mod categories;
pub mod comments;
pub mod posts;
pub mod reactions;

use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// `GET /health`
///
/// # Errors
///
/// 500 if the database does not answer.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    sqlx::query("SELECT 1").execute(state.pool()).await?;
    Ok(Json(json!({ "status": "ok" })))
}
