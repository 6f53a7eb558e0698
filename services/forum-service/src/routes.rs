//! Router assembly.
//!
//! Routes fall into three groups, each with its own auth policy:
//! public (no gate), browsing (optional identity) and protected (identity required).

use crate::handlers::{self, auth, categories, comments, posts, reactions};
use crate::middleware::AuthLayer;
use crate::state::AppState;
use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Maximum request body size (64KB).
pub const MAX_BODY_SIZE: usize = 65_536;

/// Per-request timeout.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let authenticator = state.authenticator().clone();
    let cookie_name = state.cookie().name.clone();

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/categories", get(categories::list_categories));

    let browsing = Router::new()
        .route("/api/posts", get(posts::list_posts))
        .route("/api/posts/{id}", get(posts::get_post))
        .route_layer(AuthLayer::optional(authenticator.clone()).with_cookie_name(&cookie_name));

    let protected = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me).delete(auth::delete_me))
        .route("/api/posts", post(posts::create_post))
        .route(
            "/api/posts/{id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/api/posts/{id}/comments", post(comments::create_comment))
        .route("/api/posts/{id}/reactions", post(reactions::react_to_post))
        .route("/api/comments/{id}/reactions", post(reactions::react_to_comment))
        .route_layer(AuthLayer::required(authenticator).with_cookie_name(&cookie_name));

    Router::new()
        .merge(public)
        .merge(browsing)
        .merge(protected)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
        .layer(TraceLayer::new_for_http())
}
