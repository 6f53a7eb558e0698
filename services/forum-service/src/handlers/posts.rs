//! Post handlers.

use crate::error::ApiError;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::models::{Comment, Post, ReactionCounts, ReactionTarget};
use crate::services::{Page, PostFilter};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// New post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    /// Category to file under.
    pub category_id: i64,
    /// Title.
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    /// Body.
    #[validate(length(min = 1, max = 10000, message = "content must be 1-10000 characters"))]
    pub content: String,
}

/// Query string for `GET /api/posts`.
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    /// Only posts in this category.
    pub category_id: Option<i64>,
    /// Only posts by this author.
    pub user_id: Option<i64>,
    /// Only posts this user liked.
    pub liked_by_user: Option<i64>,
    /// 1-based page number.
    pub page: Option<i64>,
    /// Posts per page.
    pub limit: Option<i64>,
}

/// One page of posts.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostPage {
    /// Posts on this page, newest first.
    pub posts: Vec<Post>,
    /// Posts matching the filters across all pages.
    pub total_count: i64,
    /// Page returned.
    pub current_page: i64,
    /// Pages available at the requested size.
    pub total_pages: i64,
}

/// A post with its comments and reaction totals.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetail {
    /// The post.
    #[serde(flatten)]
    pub post: Post,
    /// Like/dislike totals for the post.
    pub reactions: ReactionCounts,
    /// Comments, oldest first.
    pub comments: Vec<CommentDetail>,
    /// Whether the caller wrote the post (false for anonymous callers).
    pub is_author: bool,
}

/// A comment with its reaction totals.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentDetail {
    /// The comment.
    #[serde(flatten)]
    pub comment: Comment,
    /// Like/dislike totals for the comment.
    pub reactions: ReactionCounts,
}

/// `GET /api/posts`
///
/// # Errors
///
/// 500 on database failure.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostPage>, ApiError> {
    let filter = PostFilter {
        category_id: query.category_id,
        user_id: query.user_id,
        liked_by_user: query.liked_by_user,
    };
    let page = Page::new(query.page, query.limit);
    let (posts, total_count) = state.forum().list_posts(filter, page).await?;

    Ok(Json(PostPage {
        posts,
        total_count,
        current_page: page.number(),
        total_pages: page.page_count(total_count),
    }))
}

/// `GET /api/posts/{id}`
///
/// # Errors
///
/// 404 for an unknown post.
pub async fn get_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    let forum = state.forum();
    let post = forum.get_post(id).await?.ok_or(ApiError::NotFound("post"))?;

    let mut comments = Vec::new();
    for comment in forum.list_comments(id).await? {
        let reactions = forum
            .reaction_counts(ReactionTarget::Comment, comment.id)
            .await?;
        comments.push(CommentDetail { comment, reactions });
    }

    let reactions = forum.reaction_counts(ReactionTarget::Post, id).await?;
    let is_author = user.is_some_and(|u| u.user_id == post.user_id);

    Ok(Json(PostDetail {
        post,
        reactions,
        comments,
        is_author,
    }))
}

/// `POST /api/posts`
///
/// # Errors
///
/// 400 on validation failure, 404 for an unknown category.
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    request.validate()?;

    if !state.forum().category_exists(request.category_id).await? {
        return Err(ApiError::NotFound("category"));
    }

    let post = state
        .forum()
        .create_post(
            user.user_id,
            request.category_id,
            request.title.trim(),
            &request.content,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// `PUT /api/posts/{id}`
///
/// Only the author may edit a post.
///
/// # Errors
///
/// 400 on validation failure, 403 for a non-author, 404 for an unknown post or
/// category.
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    request.validate()?;

    let forum = state.forum();
    ensure_author(&state, id, user.user_id).await?;

    if !forum.category_exists(request.category_id).await? {
        return Err(ApiError::NotFound("category"));
    }

    let post = forum
        .update_post(id, request.category_id, request.title.trim(), &request.content)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    Ok(Json(post))
}

/// `DELETE /api/posts/{id}`
///
/// Only the author may delete a post. Its comments and reactions go with it.
///
/// # Errors
///
/// 403 for a non-author, 404 for an unknown post.
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ensure_author(&state, id, user.user_id).await?;

    if !state.forum().delete_post(id).await? {
        return Err(ApiError::NotFound("post"));
    }
    tracing::info!(post_id = id, user_id = user.user_id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Load a post and check that `user_id` wrote it.
async fn ensure_author(state: &AppState, id: i64, user_id: i64) -> Result<(), ApiError> {
    let post = state
        .forum()
        .get_post(id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if post.user_id != user_id {
        tracing::debug!(post_id = id, user_id, "Edit refused for non-author");
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
