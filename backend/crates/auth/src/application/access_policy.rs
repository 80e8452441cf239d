//! Access Policy
//!
//! Role gate applied after identity resolution. Role codes are compared
//! case-insensitively.

use std::collections::BTreeSet;

use crate::application::audit;
use crate::domain::entity::identity::Identity;
use crate::domain::value_object::user_role::UserRole;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Lower-cased role codes
    allowed: BTreeSet<String>,
}

impl AccessPolicy {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: roles
                .into_iter()
                .map(|r| r.as_ref().trim().to_lowercase())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    pub fn of(roles: &[UserRole]) -> Self {
        Self::new(roles.iter().map(UserRole::code))
    }

    pub fn admin_only() -> Self {
        Self::of(&[UserRole::Admin])
    }

    /// Any authenticated identity holding a role
    pub fn any_user() -> Self {
        Self::of(&UserRole::ALL)
    }

    pub fn allows(&self, role_code: &str) -> bool {
        self.allowed.contains(&role_code.trim().to_lowercase())
    }

    pub fn allowed_roles(&self) -> Vec<String> {
        self.allowed.iter().cloned().collect()
    }

    /// Pass `identity` through if its role is allowed
    pub fn require(&self, identity: Option<Identity>) -> AuthResult<Identity> {
        let identity = identity.ok_or(AuthError::Unauthenticated)?;
        let Some(role) = identity.role else {
            return Err(AuthError::MissingRole);
        };

        if !self.allows(role.code()) {
            let allowed = self.allowed_roles();
            audit::access_denied(&identity.id, Some(role.code()), &allowed);
            return Err(AuthError::Forbidden { allowed });
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::email::Email;
    use platform::password::HashedPassword;

    fn identity(role: Option<UserRole>) -> Identity {
        Identity::new(
            Email::new("someone@campus.edu").unwrap(),
            HashedPassword::from_db("unused"),
            role,
        )
    }

    #[test]
    fn test_allowed_role_passes_through() {
        let who = identity(Some(UserRole::Admin));
        let passed = AccessPolicy::admin_only().require(Some(who.clone())).unwrap();
        assert_eq!(passed.id, who.id);
    }

    #[test]
    fn test_disallowed_role_is_forbidden() {
        let err = AccessPolicy::admin_only()
            .require(Some(identity(Some(UserRole::User))))
            .unwrap_err();

        match err {
            AuthError::Forbidden { allowed } => assert_eq!(allowed, vec!["admin".to_string()]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_role() {
        let err = AccessPolicy::any_user().require(Some(identity(None))).unwrap_err();
        assert!(matches!(err, AuthError::MissingRole));
    }

    #[test]
    fn test_no_identity_is_unauthenticated() {
        let err = AccessPolicy::any_user().require(None).unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[test]
    fn test_case_insensitive_matching() {
        let policy = AccessPolicy::new(["Admin"]);
        assert!(policy.allows("admin"));
        assert!(policy.allows("ADMIN"));
        assert!(!policy.allows("user"));
        assert!(policy.require(Some(identity(Some(UserRole::Admin)))).is_ok());

        let legacy = UserRole::from_code("Admin").unwrap();
        assert!(AccessPolicy::admin_only().allows(legacy.code()));
    }

    #[test]
    fn test_any_user_accepts_both_roles() {
        let policy = AccessPolicy::any_user();
        assert!(policy.require(Some(identity(Some(UserRole::User)))).is_ok());
        assert!(policy.require(Some(identity(Some(UserRole::Admin)))).is_ok());
        assert_eq!(policy.allowed_roles(), vec!["admin", "user"]);
    }
}
