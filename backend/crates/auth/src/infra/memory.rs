//! In-Memory Identity Repository
//!
//! Process-local identity store for development and tests. Emails are
//! unique; lookups go through the same normalized form as the Postgres
//! store.

use std::collections::HashMap;
use std::sync::Arc;

use kernel::id::IdentityId;
use platform::password::{ClearTextPassword, CredentialHasher};
use tokio::sync::RwLock;

use crate::domain::entity::identity::Identity;
use crate::domain::repository::IdentityRepository;
use crate::domain::value_object::{email::Email, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Default)]
pub struct InMemoryIdentityRepository {
    identities: RwLock<HashMap<IdentityId, Identity>>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, identity: Identity) -> AuthResult<()> {
        let mut identities = self.identities.write().await;
        if identities.values().any(|i| i.email == identity.email) {
            return Err(AuthError::EmailTaken);
        }
        identities.insert(identity.id, identity);
        Ok(())
    }

    /// Hash `password` and store a new identity.
    ///
    /// The password must pass the strength policy.
    pub async fn register(
        &self,
        hasher: Arc<CredentialHasher>,
        email: Email,
        password: ClearTextPassword,
        role: Option<UserRole>,
    ) -> AuthResult<Identity> {
        platform::password::check_policy(password.as_str())?;

        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let identity = Identity::new(email, password_hash, role);
        self.insert(identity.clone()).await?;

        tracing::info!(identity_id = %identity.id, email = %identity.email, "Identity registered");
        Ok(identity)
    }

    pub async fn remove(&self, id: &IdentityId) -> Option<Identity> {
        self.identities.write().await.remove(id)
    }

    /// Change the role of a stored identity. Returns false if absent.
    pub async fn set_role(&self, id: &IdentityId, role: Option<UserRole>) -> bool {
        match self.identities.write().await.get_mut(id) {
            Some(identity) => {
                identity.role = role;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

impl IdentityRepository for InMemoryIdentityRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Identity>> {
        let identities = self.identities.read().await;
        Ok(identities.values().find(|i| &i.email == email).cloned())
    }

    async fn find_by_id(&self, id: &IdentityId) -> AuthResult<Option<Identity>> {
        Ok(self.identities.read().await.get(id).cloned())
    }
}
