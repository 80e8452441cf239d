use serde::{Deserialize, Serialize};
use std::fmt;

/// Role code that does not name a known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role code: {0}")]
pub struct UnknownRole(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 2] = [UserRole::User, UserRole::Admin];

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    /// Parse a role code, ignoring case.
    ///
    /// `usuario` is accepted as a legacy spelling of `user`.
    pub fn from_code(code: &str) -> Result<Self, UnknownRole> {
        match code.trim().to_ascii_lowercase().as_str() {
            "user" | "usuario" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(UnknownRole(code.to_string())),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for UserRole {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserRole::from_code(&value)
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_from_code() {
        assert_eq!(UserRole::from_code("user"), Ok(UserRole::User));
        assert_eq!(UserRole::from_code("admin"), Ok(UserRole::Admin));
        assert_eq!(UserRole::from_code("Admin"), Ok(UserRole::Admin));
        assert_eq!(UserRole::from_code(" ADMIN "), Ok(UserRole::Admin));
        assert_eq!(UserRole::from_code("usuario"), Ok(UserRole::User));
    }

    #[test]
    fn test_user_role_rejects_unknown() {
        assert_eq!(
            UserRole::from_code("superuser"),
            Err(UnknownRole("superuser".to_string()))
        );
        assert!(UserRole::from_code("").is_err());
    }

    #[test]
    fn test_user_role_display() {
        assert_eq!(UserRole::User.to_string(), "user");
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }

    #[test]
    fn test_user_role_serde() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<UserRole>("\"Admin\"").unwrap(),
            UserRole::Admin
        );
        assert!(serde_json::from_str::<UserRole>("\"root\"").is_err());
    }
}
