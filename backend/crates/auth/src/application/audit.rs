//! Security Audit Events
//!
//! Structured events for authentication outcomes, emitted under the
//! `security` tracing target so they can be routed separately from
//! ordinary application logs.

use kernel::id::IdentityId;

pub const SECURITY_TARGET: &str = "security";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    LoginSucceeded,
    LoginFailed,
    LoginRejectedLocked,
    AccountLockedOut,
    AccessDenied,
}

impl AuditEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            AuditEvent::LoginSucceeded => "login.success",
            AuditEvent::LoginFailed => "login.failure",
            AuditEvent::LoginRejectedLocked => "login.locked",
            AuditEvent::AccountLockedOut => "account.lockout",
            AuditEvent::AccessDenied => "access.forbidden",
        }
    }
}

pub fn login_succeeded(email: &str, identity_id: &IdentityId) {
    tracing::info!(
        target: SECURITY_TARGET,
        event = AuditEvent::LoginSucceeded.name(),
        email,
        identity_id = %identity_id,
        "Login succeeded"
    );
}

pub fn login_failed(email: &str, failed_count: u32) {
    tracing::warn!(
        target: SECURITY_TARGET,
        event = AuditEvent::LoginFailed.name(),
        email,
        failed_count,
        "Login failed"
    );
}

pub fn login_rejected_locked(email: &str) {
    tracing::warn!(
        target: SECURITY_TARGET,
        event = AuditEvent::LoginRejectedLocked.name(),
        email,
        "Login attempt on locked account"
    );
}

pub fn account_locked_out(email: &str, lockout_secs: u64) {
    tracing::warn!(
        target: SECURITY_TARGET,
        event = AuditEvent::AccountLockedOut.name(),
        email,
        lockout_secs,
        "Account locked after repeated failures"
    );
}

pub fn access_denied(identity_id: &IdentityId, role: Option<&str>, allowed: &[String]) {
    tracing::warn!(
        target: SECURITY_TARGET,
        event = AuditEvent::AccessDenied.name(),
        identity_id = %identity_id,
        role = role.unwrap_or("none"),
        allowed = %allowed.join(","),
        "Access denied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_distinct() {
        let names = [
            AuditEvent::LoginSucceeded,
            AuditEvent::LoginFailed,
            AuditEvent::LoginRejectedLocked,
            AuditEvent::AccountLockedOut,
            AuditEvent::AccessDenied,
        ]
        .map(|e| e.name());

        let mut unique = names.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }
}
