//! Token Claims
//!
//! Wire names follow JWT registered claims: `sub` carries the identity
//! id, `exp`/`iat` are Unix seconds (UTC).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::identity::Identity;
use crate::domain::value_object::user_role::UserRole;

/// Caller-supplied claims carried by a token
///
/// Every field is optional on decode so that a token lacking a subject can
/// be told apart from one that fails verification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Informational only; authorization reads the live record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl Claims {
    /// Session claims for an identity that holds `role`
    pub fn for_identity(identity: &Identity, role: UserRole) -> Self {
        Self {
            subject_id: Some(identity.id.to_string()),
            email: Some(identity.email.to_string()),
            role: Some(role),
        }
    }
}

/// Claims as signed: caller claims plus the timestamps added at issue time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(flatten)]
    pub claims: Claims,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
}
