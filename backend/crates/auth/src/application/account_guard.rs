//! Account Guard
//!
//! Tracks failed logins per email and locks the email out once the
//! policy threshold is reached. The state lives in a [`LockoutStore`]
//! shared by every guard handle, so concurrent logins for the same email
//! see each other's failures.
//!
//! Attempts for one email run one at a time: an [`AttemptPermit`] is held
//! from the lock check until the outcome is recorded, so no more than
//! `max_attempts` passwords are ever checked before the lockout applies.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::entity::lockout::{LockoutPolicy, LockoutState};

/// Process-wide lockout table keyed by normalized email
#[derive(Debug, Default)]
pub struct LockoutStore {
    entries: Mutex<HashMap<String, LockoutState>>,
    // never held across an await
    attempts: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Exclusive right to run a login attempt for one key
///
/// Dropping the permit lets the next attempt for the same key proceed.
#[derive(Debug)]
pub struct AttemptPermit {
    key: String,
    store: Arc<LockoutStore>,
    _slot: OwnedMutexGuard<()>,
}

impl Drop for AttemptPermit {
    fn drop(&mut self) {
        let mut attempts = self
            .store
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // the map and this permit hold the only references when nobody waits
        if attempts
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) <= 2)
        {
            attempts.remove(&self.key);
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountGuard {
    policy: LockoutPolicy,
    store: Arc<LockoutStore>,
}

impl AccountGuard {
    pub fn new(policy: LockoutPolicy, store: Arc<LockoutStore>) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Wait until no other attempt for `key` is in flight
    pub async fn begin_attempt(&self, key: &str) -> AttemptPermit {
        let slot = {
            let mut attempts = self
                .store
                .attempts
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            attempts.entry(key.to_string()).or_default().clone()
        };

        AttemptPermit {
            key: key.to_string(),
            store: self.store.clone(),
            _slot: slot.lock_owned().await,
        }
    }

    pub async fn is_locked(&self, key: &str) -> bool {
        self.is_locked_at(key, Utc::now()).await
    }

    /// Whether `key` is locked at `now`. An expired lockout is cleared.
    pub async fn is_locked_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.store.entries.lock().await;
        let Some(state) = entries.get_mut(key) else {
            return false;
        };

        let locked = state.evaluate(&self.policy, now);
        if state.failed_count == 0 {
            entries.remove(key);
        }
        locked
    }

    pub async fn record_failure(&self, key: &str) -> LockoutState {
        self.record_failure_at(key, Utc::now()).await
    }

    /// Count a failed attempt. Returns the updated state.
    pub async fn record_failure_at(&self, key: &str, now: DateTime<Utc>) -> LockoutState {
        let mut entries = self.store.entries.lock().await;
        let state = entries.entry(key.to_string()).or_default();
        state.record_failure(now);
        *state
    }

    /// Clear the failure history for `key`
    pub async fn record_success(&self, key: &str) {
        self.store.entries.lock().await.remove(key);
    }

    pub async fn failed_count(&self, key: &str) -> u32 {
        self.store
            .entries
            .lock()
            .await
            .get(key)
            .map(|s| s.failed_count)
            .unwrap_or(0)
    }

    /// Whether `state` has just crossed the lockout threshold
    pub fn reached_threshold(&self, state: &LockoutState) -> bool {
        state.failed_count == self.policy.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    const KEY: &str = "student@campus.edu";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    fn guard() -> AccountGuard {
        AccountGuard::new(LockoutPolicy::default(), Arc::new(LockoutStore::new()))
    }

    #[tokio::test]
    async fn test_unknown_key_is_unlocked() {
        let guard = guard();
        assert!(!guard.is_locked_at(KEY, t0()).await);
        assert_eq!(guard.failed_count(KEY).await, 0);
    }

    #[tokio::test]
    async fn test_fifth_failure_locks() {
        let guard = guard();

        for i in 0..4 {
            guard.record_failure_at(KEY, t0() + secs(i)).await;
        }
        assert!(!guard.is_locked_at(KEY, t0() + secs(5)).await);

        let state = guard.record_failure_at(KEY, t0() + secs(10)).await;
        assert!(guard.reached_threshold(&state));
        assert!(guard.is_locked_at(KEY, t0() + secs(11)).await);
    }

    #[tokio::test]
    async fn test_lockout_expires_and_resets() {
        let guard = guard();
        for _ in 0..5 {
            guard.record_failure_at(KEY, t0()).await;
        }

        assert!(guard.is_locked_at(KEY, t0() + secs(299)).await);
        assert!(!guard.is_locked_at(KEY, t0() + secs(301)).await);
        assert_eq!(guard.failed_count(KEY).await, 0);
    }

    #[tokio::test]
    async fn test_success_clears_history() {
        let guard = guard();
        for _ in 0..3 {
            guard.record_failure_at(KEY, t0()).await;
        }
        guard.record_success(KEY).await;
        assert_eq!(guard.failed_count(KEY).await, 0);

        // a fresh run of failures is needed to lock again
        for _ in 0..4 {
            guard.record_failure_at(KEY, t0()).await;
        }
        assert!(!guard.is_locked_at(KEY, t0()).await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let guard = guard();
        for _ in 0..5 {
            guard.record_failure_at(KEY, t0()).await;
        }
        assert!(guard.is_locked_at(KEY, t0()).await);
        assert!(!guard.is_locked_at("other@campus.edu", t0()).await);
    }

    #[tokio::test]
    async fn test_handles_share_store() {
        let store = Arc::new(LockoutStore::new());
        let policy = LockoutPolicy {
            max_attempts: 2,
            lockout_duration: Duration::from_secs(60),
        };
        let a = AccountGuard::new(policy, store.clone());
        let b = AccountGuard::new(policy, store);

        a.record_failure_at(KEY, t0()).await;
        b.record_failure_at(KEY, t0()).await;
        assert!(a.is_locked_at(KEY, t0()).await);
    }

    #[tokio::test]
    async fn test_attempts_for_one_key_are_exclusive() {
        let guard = guard();
        let permit = guard.begin_attempt(KEY).await;

        let waiting = tokio::time::timeout(Duration::from_millis(50), guard.begin_attempt(KEY));
        assert!(waiting.await.is_err());

        // other keys are not blocked
        let other = guard.begin_attempt("other@campus.edu").await;
        drop(other);

        drop(permit);
        let again = guard.begin_attempt(KEY).await;
        drop(again);
    }

    #[tokio::test]
    async fn test_released_permits_leave_no_slots() {
        let guard = guard();
        let first = guard.begin_attempt(KEY).await;

        let waiter = {
            let guard = guard.clone();
            tokio::spawn(async move {
                let _permit = guard.begin_attempt(KEY).await;
            })
        };
        tokio::task::yield_now().await;

        drop(first);
        waiter.await.unwrap();

        assert!(guard.store.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_failures_are_all_counted() {
        let guard = guard();
        let mut handles = Vec::new();
        for _ in 0..20 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move {
                guard.record_failure(KEY).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(guard.failed_count(KEY).await, 20);
    }
}
