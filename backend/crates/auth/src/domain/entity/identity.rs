//! Identity Entity
//!
//! A person who can authenticate. Records are owned by user management;
//! this crate only reads them.

use chrono::{DateTime, Utc};
use kernel::id::IdentityId;
use platform::password::HashedPassword;

use crate::domain::value_object::{email::Email, user_role::UserRole};

#[derive(Debug, Clone)]
pub struct Identity {
    pub id: IdentityId,
    pub email: Email,
    pub password_hash: HashedPassword,
    /// `None` when the record carries no role; such identities
    /// authenticate but cannot be issued a token.
    pub role: Option<UserRole>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(email: Email, password_hash: HashedPassword, role: Option<UserRole>) -> Self {
        Self {
            id: IdentityId::new(),
            email,
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }

    /// Role code, or `None` for an identity without a role
    pub fn role_code(&self) -> Option<&'static str> {
        self.role.map(|r| r.code())
    }
}
