//! Auth gate middleware.
//!
//! Extracts a token from the `Authorization: Bearer` header (falling back to the
//! token cookie), authenticates it against the live session, and inserts the
//! resulting [`AuthenticatedUser`] into the request extensions.
//!
//! Apply per route group with [`axum::Router::route_layer`]:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/api/posts", post(create_post))
//!     .route_layer(AuthLayer::required(authenticator.clone()));
//! ```

use crate::error::AuthError;
use crate::services::{AuthenticatedUser, Authenticator};
use axum::{
    body::Body,
    extract::Request,
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap,
    },
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Default token cookie name.
pub const TOKEN_COOKIE_NAME: &str = "token";

/// What to do with requests that do not authenticate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Reject with 401.
    Required,
    /// Let the request through anonymously.
    Optional,
}

/// Layer for the auth gate.
#[derive(Clone, Debug)]
pub struct AuthLayer {
    authenticator: Authenticator,
    policy: AuthPolicy,
    cookie_name: Arc<str>,
}

impl AuthLayer {
    /// Create an auth layer with the given policy.
    #[must_use]
    pub fn new(authenticator: Authenticator, policy: AuthPolicy) -> Self {
        Self {
            authenticator,
            policy,
            cookie_name: Arc::from(TOKEN_COOKIE_NAME),
        }
    }

    /// Gate that rejects unauthenticated requests.
    #[must_use]
    pub fn required(authenticator: Authenticator) -> Self {
        Self::new(authenticator, AuthPolicy::Required)
    }

    /// Gate that attaches identity when present and otherwise passes through.
    #[must_use]
    pub fn optional(authenticator: Authenticator) -> Self {
        Self::new(authenticator, AuthPolicy::Optional)
    }

    /// Read the cookie fallback from `name` instead of [`TOKEN_COOKIE_NAME`].
    #[must_use]
    pub fn with_cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = Arc::from(name);
        self
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            authenticator: self.authenticator.clone(),
            policy: self.policy,
            cookie_name: Arc::clone(&self.cookie_name),
        }
    }
}

/// Auth gate service.
#[derive(Clone, Debug)]
pub struct AuthMiddleware<S> {
    inner: S,
    authenticator: Authenticator,
    policy: AuthPolicy,
    cookie_name: Arc<str>,
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let authenticator = self.authenticator.clone();
        let policy = self.policy;
        let token = extract_token(req.headers(), &self.cookie_name);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match resolve(&authenticator, policy, token.as_deref()).await {
                Ok(Some(user)) => {
                    req.extensions_mut().insert(user);
                }
                Ok(None) => {}
                Err(err) => return Ok(err.into_response()),
            }

            inner.call(req).await
        })
    }
}

/// Decide the request's identity under `policy`.
async fn resolve(
    authenticator: &Authenticator,
    policy: AuthPolicy,
    token: Option<&str>,
) -> Result<Option<AuthenticatedUser>, AuthError> {
    let Some(token) = token else {
        return match policy {
            AuthPolicy::Required => Err(AuthError::MissingCredentials),
            AuthPolicy::Optional => Ok(None),
        };
    };

    match authenticator.authenticate(token).await {
        Ok(user) => Ok(Some(user)),
        // Store failures are never downgraded to anonymous
        Err(err) if !err.is_unauthorized() => Err(err),
        Err(err) => match policy {
            AuthPolicy::Required => Err(err),
            AuthPolicy::Optional => {
                tracing::debug!(reason = %err, "Ignoring invalid credential on optional route");
                Ok(None)
            }
        },
    }
}

/// Pull a candidate token from the request: bearer header first, then cookie.
#[must_use]
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers, cookie_name))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| name.trim() == cookie_name && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

/// Require authentication on every route already added to `router`.
#[must_use]
pub fn protect_route<S>(router: Router<S>, authenticator: Authenticator) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(AuthLayer::required(authenticator))
}
