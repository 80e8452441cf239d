//! Authenticate Use Case
//!
//! Checks an email/password pair against the identity store under the
//! account lockout policy, and issues session tokens.

use std::sync::Arc;
use std::time::Duration;

use platform::password::{ClearTextPassword, CredentialHasher};

use crate::application::account_guard::AccountGuard;
use crate::application::audit;
use crate::domain::entity::{claims::Claims, identity::Identity};
use crate::domain::repository::IdentityRepository;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};
use crate::infra::jwt::{IssuedToken, TokenCodec};

/// Login output
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub token: IssuedToken,
    pub identity: Identity,
}

pub struct Authenticator<R>
where
    R: IdentityRepository,
{
    repo: Arc<R>,
    hasher: Arc<CredentialHasher>,
    guard: AccountGuard,
    codec: Arc<TokenCodec>,
}

impl<R> Authenticator<R>
where
    R: IdentityRepository,
{
    pub fn new(
        repo: Arc<R>,
        hasher: Arc<CredentialHasher>,
        guard: AccountGuard,
        codec: Arc<TokenCodec>,
    ) -> Self {
        Self {
            repo,
            hasher,
            guard,
            codec,
        }
    }

    pub fn guard(&self) -> &AccountGuard {
        &self.guard
    }

    /// Verify credentials.
    ///
    /// Returns `Ok(None)` for an unknown email or a wrong password, and
    /// `AccountLocked` when the email is locked out; the lock is checked
    /// before anything else, so a locked account is refused even with the
    /// right password.
    ///
    /// Concurrent attempts for the same email are taken one at a time.
    pub async fn authenticate(
        &self,
        email: &str,
        password: ClearTextPassword,
    ) -> AuthResult<Option<Identity>> {
        let key = Email::normalize(email);
        let _attempt = self.guard.begin_attempt(&key).await;

        if self.guard.is_locked(&key).await {
            audit::login_rejected_locked(&key);
            return Err(AuthError::AccountLocked);
        }

        // unparseable emails cannot match a stored identity
        let Ok(email) = Email::new(&key) else {
            audit::login_failed(&key, self.guard.failed_count(&key).await);
            return Ok(None);
        };

        let Some(identity) = self.repo.find_by_email(&email).await? else {
            audit::login_failed(&key, self.guard.failed_count(&key).await);
            return Ok(None);
        };

        if !self.verify_password(password, &identity).await {
            let state = self.guard.record_failure(&key).await;
            audit::login_failed(&key, state.failed_count);
            if self.guard.reached_threshold(&state) {
                audit::account_locked_out(&key, self.guard.policy().lockout_duration.as_secs());
            }
            return Ok(None);
        }

        self.guard.record_success(&key).await;
        audit::login_succeeded(&key, &identity.id);

        if self.hasher.needs_rehash(&identity.password_hash) {
            tracing::info!(identity_id = %identity.id, "Stored password hash uses outdated parameters");
        }

        Ok(Some(identity))
    }

    /// Issue a session token for `identity`.
    ///
    /// `ttl` defaults to the codec's configured lifetime.
    pub fn issue_session(
        &self,
        identity: &Identity,
        ttl: Option<Duration>,
    ) -> AuthResult<IssuedToken> {
        let role = identity.role.ok_or(AuthError::MissingRole)?;
        let claims = Claims::for_identity(identity, role);
        let ttl = ttl.unwrap_or_else(|| self.codec.default_ttl());

        Ok(self.codec.issue(&claims, ttl)?)
    }

    /// Authenticate and issue a token in one step
    pub async fn login(&self, email: &str, password: ClearTextPassword) -> AuthResult<LoginOutput> {
        let identity = self
            .authenticate(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self.issue_session(&identity, None)?;

        Ok(LoginOutput { token, identity })
    }

    /// Runs the hash comparison off the async executor; any failure
    /// counts as a mismatch.
    async fn verify_password(&self, password: ClearTextPassword, identity: &Identity) -> bool {
        let hasher = self.hasher.clone();
        let digest = identity.password_hash.clone();

        match tokio::task::spawn_blocking(move || hasher.verify(&password, &digest)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::account_guard::LockoutStore;
    use crate::domain::entity::lockout::LockoutPolicy;
    use crate::domain::value_object::user_role::UserRole;
    use crate::infra::jwt::DEFAULT_TOKEN_TTL;
    use crate::infra::memory::InMemoryIdentityRepository;
    use platform::password::HashCost;

    const PRIVATE: &[u8] = include_bytes!("../../tests/fixtures/private.pem");
    const PUBLIC: &[u8] = include_bytes!("../../tests/fixtures/public.pem");
    const PASSWORD: &str = "Campus!Secret2024";

    struct Fixture {
        repo: Arc<InMemoryIdentityRepository>,
        codec: Arc<TokenCodec>,
        authenticator: Authenticator<InMemoryIdentityRepository>,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryIdentityRepository::new());
        let hasher = Arc::new(CredentialHasher::new(b"pepper".to_vec(), HashCost::minimal()).unwrap());
        let codec = Arc::new(TokenCodec::from_pem(PRIVATE, PUBLIC, DEFAULT_TOKEN_TTL).unwrap());
        let guard = AccountGuard::new(LockoutPolicy::default(), Arc::new(LockoutStore::new()));

        for (email, role) in [
            ("admin@campus.edu", Some(UserRole::Admin)),
            ("student@campus.edu", Some(UserRole::User)),
            ("norole@campus.edu", None),
        ] {
            repo.register(
                hasher.clone(),
                Email::new(email).unwrap(),
                ClearTextPassword::new(PASSWORD),
                role,
            )
            .await
            .unwrap();
        }

        let authenticator = Authenticator::new(repo.clone(), hasher, guard, codec.clone());
        Fixture {
            repo,
            codec,
            authenticator,
        }
    }

    fn pw(s: &str) -> ClearTextPassword {
        ClearTextPassword::new(s)
    }

    #[tokio::test]
    async fn test_correct_credentials() {
        let f = fixture().await;
        let identity = f
            .authenticator
            .authenticate("admin@campus.edu", pw(PASSWORD))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(identity.email.as_str(), "admin@campus.edu");
        assert_eq!(identity.role, Some(UserRole::Admin));
    }

    #[tokio::test]
    async fn test_email_is_matched_case_insensitively() {
        let f = fixture().await;
        let identity = f
            .authenticator
            .authenticate("  Admin@Campus.EDU ", pw(PASSWORD))
            .await
            .unwrap();
        assert!(identity.is_some());
    }

    #[tokio::test]
    async fn test_wrong_password_counts_failure() {
        let f = fixture().await;
        let result = f
            .authenticator
            .authenticate("admin@campus.edu", pw("Wrong!Password1"))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(f.authenticator.guard().failed_count("admin@campus.edu").await, 1);
    }

    #[tokio::test]
    async fn test_unknown_email_is_absent_without_counting() {
        let f = fixture().await;
        let auth = &f.authenticator;

        assert!(auth.authenticate("ghost@campus.edu", pw(PASSWORD)).await.unwrap().is_none());
        assert!(auth.authenticate("not-an-email", pw(PASSWORD)).await.unwrap().is_none());
        assert_eq!(auth.guard().failed_count("ghost@campus.edu").await, 0);
    }

    #[tokio::test]
    async fn test_lockout_refuses_correct_password() {
        let f = fixture().await;
        let auth = &f.authenticator;

        for _ in 0..5 {
            let r = auth.authenticate("student@campus.edu", pw("Wrong!Password1")).await;
            assert!(matches!(r, Ok(None)));
        }

        let err = auth
            .authenticate("student@campus.edu", pw(PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));

        // other accounts are unaffected
        assert!(auth.authenticate("admin@campus.edu", pw(PASSWORD)).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_guessing_stops_at_threshold() {
        let f = fixture().await;
        let auth = Arc::new(f.authenticator);

        let mut handles = Vec::new();
        for _ in 0..30 {
            let auth = auth.clone();
            handles.push(tokio::spawn(async move {
                auth.authenticate("student@campus.edu", pw("Wrong!Password1")).await
            }));
        }

        let (mut checked, mut locked) = (0, 0);
        for h in handles {
            match h.await.unwrap() {
                Ok(None) => checked += 1,
                Err(AuthError::AccountLocked) => locked += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(checked, 5);
        assert_eq!(locked, 25);
        assert_eq!(auth.guard().failed_count("student@campus.edu").await, 5);
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        let f = fixture().await;
        let auth = &f.authenticator;

        for _ in 0..4 {
            auth.authenticate("student@campus.edu", pw("Wrong!Password1")).await.unwrap();
        }
        assert!(auth.authenticate("student@campus.edu", pw(PASSWORD)).await.unwrap().is_some());
        assert_eq!(auth.guard().failed_count("student@campus.edu").await, 0);
    }

    #[tokio::test]
    async fn test_login_issues_token_with_identity_claims() {
        let f = fixture().await;
        let output = f.authenticator.login("admin@campus.edu", pw(PASSWORD)).await.unwrap();

        let payload = f.codec.verify(&output.token.token).unwrap();
        assert_eq!(payload.claims.subject_id, Some(output.identity.id.to_string()));
        assert_eq!(payload.claims.email.as_deref(), Some("admin@campus.edu"));
        assert_eq!(payload.claims.role, Some(UserRole::Admin));
        assert_eq!(
            (payload.expires_at - payload.issued_at).num_seconds(),
            DEFAULT_TOKEN_TTL.as_secs() as i64
        );
    }

    #[tokio::test]
    async fn test_login_with_bad_password_is_invalid_credentials() {
        let f = fixture().await;
        let err = f
            .authenticator
            .login("admin@campus.edu", pw("Wrong!Password1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_identity_without_role_cannot_get_token() {
        let f = fixture().await;
        let err = f
            .authenticator
            .login("norole@campus.edu", pw(PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingRole));
    }

    #[tokio::test]
    async fn test_issue_session_with_custom_ttl() {
        let f = fixture().await;
        let identity = f
            .repo
            .find_by_email(&Email::new("student@campus.edu").unwrap())
            .await
            .unwrap()
            .unwrap();

        let issued = f
            .authenticator
            .issue_session(&identity, Some(Duration::from_secs(120)))
            .unwrap();
        let payload = f.codec.verify(&issued.token).unwrap();
        assert_eq!((payload.expires_at - payload.issued_at).num_seconds(), 120);
    }
}
