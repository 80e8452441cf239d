//! Rate Limiting Infrastructure
//!
//! Sliding-window request counting keyed by an opaque string (normally the
//! client address). State is in-process and lost on restart.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Trailing window length
    pub window: Duration,
    /// Reverse proxies whose `X-Forwarded-For` header is believed
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            trusted_proxies: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            trusted_proxies: Vec::new(),
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = proxies;
        self
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub limited: bool,
    /// Requests counted in the window after this check
    pub current_count: u32,
    /// Time until the oldest counted request leaves the window (only when limited)
    pub retry_after: Option<Duration>,
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count a request for `key` unless the window is already full
    async fn check(&self, key: &str) -> RateLimitResult;
}

/// In-memory sliding-window limiter
///
/// Each key owns a queue of request instants, oldest first. The whole
/// prune/compare/append sequence runs under one lock, so concurrent
/// requests for the same key never lose an increment.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// [`RateLimitStore::check`] against an explicit clock reading
    pub async fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_default();

        prune(window, now, self.config.window);

        if window.len() >= self.config.max_requests as usize {
            // rejected requests are not recorded
            let retry_after = window
                .front()
                .map(|&oldest| {
                    self.config
                        .window
                        .saturating_sub(now.saturating_duration_since(oldest))
                })
                .unwrap_or(self.config.window);

            tracing::warn!(
                target: "security",
                event = "rate_limited",
                client = key,
                count = window.len(),
                "Rate limit exceeded"
            );

            return RateLimitResult {
                limited: true,
                current_count: window.len() as u32,
                retry_after: Some(retry_after),
            };
        }

        window.push_back(now);

        RateLimitResult {
            limited: false,
            current_count: window.len() as u32,
            retry_after: None,
        }
    }

    /// Drop keys whose window is empty. Returns how many were removed.
    pub async fn purge_idle(&self) -> usize {
        self.purge_idle_at(Instant::now()).await
    }

    pub async fn purge_idle_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| {
            prune(window, now, self.config.window);
            !window.is_empty()
        });
        before - windows.len()
    }

    /// Number of keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}

impl RateLimitStore for SlidingWindowLimiter {
    async fn check(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Instant::now()).await
    }
}

/// Remove entries at least `window` old
fn prune(window: &mut VecDeque<Instant>, now: Instant, length: Duration) {
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) >= length {
            window.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fourth_request_is_limited() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(3, 60));
        let now = Instant::now();

        let mut seen = Vec::new();
        for _ in 0..4 {
            let r = limiter.check_at("10.0.0.1", now).await;
            seen.push((r.limited, r.current_count));
        }

        assert_eq!(
            seen,
            vec![(false, 1), (false, 2), (false, 3), (true, 3)]
        );
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(2, 60));
        let start = Instant::now();

        assert!(!limiter.check_at("ip", start).await.limited);
        assert!(
            !limiter
                .check_at("ip", start + Duration::from_secs(30))
                .await
                .limited
        );

        let blocked = limiter.check_at("ip", start + Duration::from_secs(45)).await;
        assert!(blocked.limited);
        assert_eq!(blocked.retry_after, Some(Duration::from_secs(15)));

        // the first request has aged out; the rejected one was never recorded
        let r = limiter.check_at("ip", start + Duration::from_secs(60)).await;
        assert!(!r.limited);
        assert_eq!(r.current_count, 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(1, 60));
        let now = Instant::now();

        assert!(!limiter.check_at("a", now).await.limited);
        assert!(limiter.check_at("a", now).await.limited);
        assert!(!limiter.check_at("b", now).await.limited);
    }

    #[tokio::test]
    async fn test_zero_budget_always_limits() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(0, 60));
        let r = limiter.check_at("a", Instant::now()).await;
        assert!(r.limited);
        assert_eq!(r.current_count, 0);
        assert_eq!(r.retry_after, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_purge_idle() {
        let limiter = SlidingWindowLimiter::new(RateLimitConfig::new(5, 10));
        let start = Instant::now();

        limiter.check_at("old", start).await;
        limiter.check_at("fresh", start + Duration::from_secs(8)).await;
        assert_eq!(limiter.tracked_keys().await, 2);

        let removed = limiter.purge_idle_at(start + Duration::from_secs(12)).await;
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_checks_do_not_lose_updates() {
        let limiter = Arc::new(SlidingWindowLimiter::new(RateLimitConfig::new(50, 60)));

        let mut handles = Vec::new();
        for _ in 0..80 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                RateLimitStore::check(limiter.as_ref(), "shared").await
            }));
        }

        let mut allowed = 0;
        for h in handles {
            if !h.await.unwrap().limited {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 50);
    }
}
