//! Comment handlers.

use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::models::Comment;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

/// New comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    /// Body.
    #[validate(length(min = 1, max = 2000, message = "comment must be 1-2000 characters"))]
    pub content: String,
}

/// `POST /api/posts/{id}/comments`
///
/// # Errors
///
/// 400 on validation failure, 404 for an unknown post.
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    request.validate()?;

    if state.forum().get_post(post_id).await?.is_none() {
        return Err(ApiError::NotFound("post"));
    }

    let comment = state
        .forum()
        .create_comment(post_id, user.user_id, &request.content)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}
