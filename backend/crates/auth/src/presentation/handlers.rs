//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use platform::password::{ClearTextPassword, CredentialHasher};
use std::sync::Arc;

use crate::application::{AccountGuard, Authenticator, RequestIdentityResolver};
use crate::domain::repository::IdentityRepository;
use crate::error::AuthResult;
use crate::infra::jwt::TokenCodec;
use crate::presentation::dto::{LoginRequest, LoginResponse, MessageResponse, VerifyResponse};
use crate::presentation::middleware::CurrentIdentity;

/// Shared state for auth handlers
pub struct AuthAppState<R>
where
    R: IdentityRepository + Send + Sync + 'static,
{
    pub authenticator: Arc<Authenticator<R>>,
    pub resolver: Arc<RequestIdentityResolver<R>>,
}

impl<R> AuthAppState<R>
where
    R: IdentityRepository + Send + Sync + 'static,
{
    pub fn new(
        repo: Arc<R>,
        codec: Arc<TokenCodec>,
        hasher: Arc<CredentialHasher>,
        guard: AccountGuard,
    ) -> Self {
        Self {
            authenticator: Arc::new(Authenticator::new(
                repo.clone(),
                hasher,
                guard,
                codec.clone(),
            )),
            resolver: Arc::new(RequestIdentityResolver::new(repo, codec)),
        }
    }
}

impl<R> Clone for AuthAppState<R>
where
    R: IdentityRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

// ============================================================================
// Login
// ============================================================================

/// POST /auth/login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<Json<LoginResponse>>
where
    R: IdentityRepository + Send + Sync + 'static,
{
    let output = state
        .authenticator
        .login(&req.email, ClearTextPassword::new(req.password))
        .await?;

    Ok(Json(LoginResponse::bearer(
        output.token.token,
        output.token.expires_at,
    )))
}

// ============================================================================
// Logout
// ============================================================================

/// POST /auth/logout
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Logged out",
    })
}

// ============================================================================
// Verify
// ============================================================================

/// GET /auth/verify
pub async fn verify(CurrentIdentity(identity): CurrentIdentity) -> Json<VerifyResponse> {
    Json(VerifyResponse::from(&identity))
}
