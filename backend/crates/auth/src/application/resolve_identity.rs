//! Resolve Identity Use Case
//!
//! Maps a bearer token to the live identity record it names. Roles and
//! existence are always read from the store, never trusted from claims.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::IdentityId;

use crate::domain::entity::identity::Identity;
use crate::domain::repository::IdentityRepository;
use crate::error::{AuthError, AuthResult};
use crate::infra::jwt::TokenCodec;

pub struct RequestIdentityResolver<R>
where
    R: IdentityRepository,
{
    repo: Arc<R>,
    codec: Arc<TokenCodec>,
}

impl<R> RequestIdentityResolver<R>
where
    R: IdentityRepository,
{
    pub fn new(repo: Arc<R>, codec: Arc<TokenCodec>) -> Self {
        Self { repo, codec }
    }

    pub async fn resolve(&self, token: &str) -> AuthResult<Identity> {
        self.resolve_at(token, Utc::now()).await
    }

    pub async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Identity> {
        let payload = self.codec.verify_at(token, now).map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            AuthError::from(e)
        })?;

        let subject = payload
            .claims
            .subject_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingSubject)?;

        // a subject that is not an identity id cannot name anyone
        let id = IdentityId::parse_str(subject).map_err(|_| AuthError::MissingSubject)?;

        self.repo
            .find_by_id(&id)
            .await?
            .ok_or(AuthError::UnknownIdentity)
    }
}
