//! Lockout State
//!
//! Per-email failed login tracking. A key is locked once its failure
//! count reaches the policy threshold and stays locked until the lockout
//! duration has elapsed since the most recent failure.

use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger a lockout
    pub max_attempts: u32,
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutState {
    pub failed_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl LockoutState {
    /// Whether the key is locked at `now`.
    ///
    /// An expired lockout resets the state in place.
    pub fn evaluate(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> bool {
        if self.failed_count < policy.max_attempts {
            return false;
        }

        match self.last_failure_at {
            Some(last) if elapsed_since(last, now) < policy.lockout_duration => true,
            _ => {
                self.reset();
                false
            }
        }
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failed_count = self.failed_count.saturating_add(1);
        self.last_failure_at = Some(now);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Instant the lockout ends, if the threshold has been reached
    pub fn locked_until(&self, policy: &LockoutPolicy) -> Option<DateTime<Utc>> {
        if self.failed_count < policy.max_attempts {
            return None;
        }
        let duration = chrono::Duration::from_std(policy.lockout_duration).ok()?;
        self.last_failure_at.map(|last| last + duration)
    }
}

/// Clock readings that go backwards count as no time elapsed
fn elapsed_since(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(earlier)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn failed(times: u32, at: DateTime<Utc>) -> LockoutState {
        let mut state = LockoutState::default();
        for _ in 0..times {
            state.record_failure(at);
        }
        state
    }

    #[test]
    fn test_below_threshold_is_not_locked() {
        let policy = LockoutPolicy::default();
        let mut state = failed(4, t0());
        assert!(!state.evaluate(&policy, t0()));
        assert_eq!(state.failed_count, 4);
        assert_eq!(state.locked_until(&policy), None);
    }

    #[test]
    fn test_threshold_locks_for_duration() {
        let policy = LockoutPolicy::default();
        let mut state = failed(5, t0());

        assert!(state.evaluate(&policy, t0() + chrono::Duration::seconds(299)));
        assert_eq!(
            state.locked_until(&policy),
            Some(t0() + chrono::Duration::seconds(300))
        );
    }

    #[test]
    fn test_expired_lockout_resets() {
        let policy = LockoutPolicy::default();
        let mut state = failed(5, t0());

        assert!(!state.evaluate(&policy, t0() + chrono::Duration::seconds(300)));
        assert_eq!(state, LockoutState::default());
    }

    #[test]
    fn test_clock_going_backwards_stays_locked() {
        let policy = LockoutPolicy::default();
        let mut state = failed(5, t0());
        assert!(state.evaluate(&policy, t0() - chrono::Duration::seconds(10)));
    }
}
