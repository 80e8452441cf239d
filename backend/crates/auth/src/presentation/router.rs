//! Auth Router

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::{AccessPolicy, RequestIdentityResolver};
use crate::domain::repository::IdentityRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{require_identity, require_roles};

/// Create the auth router
///
/// `/verify` requires a bearer token; `/login` and `/logout` are public.
pub fn auth_router<R>(state: AuthAppState<R>) -> Router
where
    R: IdentityRepository + Send + Sync + 'static,
{
    let verify = guarded(
        Router::new().route("/verify", get(handlers::verify)),
        state.resolver.clone(),
        AccessPolicy::any_user(),
    );

    Router::new()
        .route("/login", post(handlers::login::<R>))
        .route("/logout", post(handlers::logout))
        .with_state(state)
        .merge(verify)
}

/// Protect every route in `routes` with identity resolution followed by
/// `policy`.
pub fn guarded<S, R>(
    routes: Router<S>,
    resolver: Arc<RequestIdentityResolver<R>>,
    policy: AccessPolicy,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    R: IdentityRepository + Send + Sync + 'static,
{
    // the last layer added runs first
    routes
        .route_layer(from_fn(require_roles(policy)))
        .route_layer(from_fn_with_state(resolver, require_identity::<R>))
}
