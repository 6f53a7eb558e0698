//! Like/dislike handlers for posts and comments.

use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::models::{ReactionCounts, ReactionKind, ReactionTarget};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// Reaction request.
#[derive(Debug, Deserialize)]
pub struct ReactRequest {
    /// `like` or `dislike`.
    pub kind: ReactionKind,
}

/// Outcome of a reaction toggle.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReactResponse {
    /// The caller's reaction after the toggle, `None` if it was removed.
    pub reaction: Option<ReactionKind>,
    /// Updated totals for the target.
    pub counts: ReactionCounts,
}

/// `POST /api/posts/{id}/reactions`
///
/// # Errors
///
/// 404 for an unknown post.
pub async fn react_to_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<ReactRequest>,
) -> Result<Json<ReactResponse>, ApiError> {
    react(&state, user.user_id, ReactionTarget::Post, id, request.kind).await
}

/// `POST /api/comments/{id}/reactions`
///
/// # Errors
///
/// 404 for an unknown comment.
pub async fn react_to_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<ReactRequest>,
) -> Result<Json<ReactResponse>, ApiError> {
    react(&state, user.user_id, ReactionTarget::Comment, id, request.kind).await
}

async fn react(
    state: &AppState,
    user_id: i64,
    target: ReactionTarget,
    target_id: i64,
    kind: ReactionKind,
) -> Result<Json<ReactResponse>, ApiError> {
    let forum = state.forum();
    if !forum.target_exists(target, target_id).await? {
        return Err(ApiError::NotFound(target.as_str()));
    }

    let reaction = forum.toggle_reaction(user_id, target, target_id, kind).await?;
    let counts = forum.reaction_counts(target, target_id).await?;

    tracing::debug!(user_id, target = target.as_str(), target_id, ?reaction, "Reaction toggled");
    Ok(Json(ReactResponse { reaction, counts }))
}
