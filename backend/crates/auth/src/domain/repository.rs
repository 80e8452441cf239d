//! Repository Traits
//!
//! Read access to identity records. Implementations live in `infra/`.

use kernel::id::IdentityId;

use crate::domain::entity::identity::Identity;
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

#[trait_variant::make(IdentityRepository: Send)]
pub trait LocalIdentityRepository {
    /// Find an identity by normalized email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Identity>>;

    /// Find an identity by id
    async fn find_by_id(&self, id: &IdentityId) -> AuthResult<Option<Identity>>;
}
