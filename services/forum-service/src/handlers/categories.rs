//! Category listing.

use crate::error::ApiError;
use crate::models::Category;
use crate::state::AppState;
use axum::{extract::State, Json};

/// `GET /api/categories`
///
/// # Errors
///
/// 500 on database failure.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.forum().list_categories().await?))
}
