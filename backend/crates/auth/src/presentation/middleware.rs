//! Auth Middleware
//!
//! Request gates, outermost first:
//!
//! 1. [`rate_limit`] counts every request per client address.
//! 2. [`require_identity`] resolves the bearer token to a live identity
//!    and stores it as [`CurrentIdentity`] in the request extensions.
//! 3. Role guards built by [`require_roles`] check that identity against
//!    an [`AccessPolicy`].

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::{client_key, extract_bearer_token, extract_client_ip};
use platform::rate_limit::{RateLimitStore, SlidingWindowLimiter};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use crate::application::{AccessPolicy, RequestIdentityResolver};
use crate::domain::entity::identity::Identity;
use crate::domain::repository::IdentityRepository;
use crate::error::AuthError;

/// Identity resolved for the current request
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentIdentity>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

// ============================================================================
// Rate Limiting
// ============================================================================

/// Reject the request with 429 once the client's window is full
///
/// Clients are keyed by socket peer address. `X-Forwarded-For` only
/// counts when the peer is one of the limiter's trusted proxies.
pub async fn rate_limit(
    State(limiter): State<Arc<SlidingWindowLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let key = client_key(extract_client_ip(
        req.headers(),
        peer_ip,
        &limiter.config().trusted_proxies,
    ));

    let result = RateLimitStore::check(limiter.as_ref(), &key).await;
    if result.limited {
        let retry_after_secs = result
            .retry_after
            .unwrap_or(limiter.config().window)
            .as_secs_f64()
            .ceil() as u64;
        return AuthError::RateLimited {
            retry_after_secs: retry_after_secs.max(1),
        }
        .into_response();
    }

    next.run(req).await
}

// ============================================================================
// Identity Resolution
// ============================================================================

/// Require a valid bearer token naming a live identity
pub async fn require_identity<R>(
    State(resolver): State<Arc<RequestIdentityResolver<R>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: IdentityRepository + Send + Sync + 'static,
{
    let token = extract_bearer_token(req.headers())?;
    let identity = resolver.resolve(&token).await?;

    req.extensions_mut().insert(CurrentIdentity(identity));
    Ok(next.run(req).await)
}

// ============================================================================
// Role Guards
// ============================================================================

pub type GuardFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Build a guard admitting only identities whose role `policy` allows.
///
/// Must run inside [`require_identity`]; use with
/// `axum::middleware::from_fn`.
pub fn require_roles(
    policy: AccessPolicy,
) -> impl Fn(Request, Next) -> GuardFuture + Clone + Send + Sync + 'static {
    let policy = Arc::new(policy);
    move |req: Request, next: Next| -> GuardFuture {
        let policy = policy.clone();
        Box::pin(async move {
            let identity = req.extensions().get::<CurrentIdentity>().map(|c| c.0.clone());
            match policy.require(identity) {
                Ok(_) => next.run(req).await,
                Err(e) => e.into_response(),
            }
        })
    }
}

/// Admin-only guard
pub fn require_admin() -> impl Fn(Request, Next) -> GuardFuture + Clone + Send + Sync + 'static {
    require_roles(AccessPolicy::admin_only())
}

/// Guard admitting any identity that holds a role
pub fn require_user() -> impl Fn(Request, Next) -> GuardFuture + Clone + Send + Sync + 'static {
    require_roles(AccessPolicy::any_user())
}
