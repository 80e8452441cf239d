//! Application Configuration
//!
//! Settings for the auth application layer, read from the environment at
//! startup. Any missing or unusable value is fatal.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use platform::password::HashCost;
use platform::rate_limit::RateLimitConfig;
use thiserror::Error;

use crate::domain::entity::lockout::LockoutPolicy;
use crate::infra::jwt::DEFAULT_TOKEN_TTL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// PEM private key used to sign tokens
    pub private_key_path: PathBuf,
    /// PEM public key used to verify tokens
    pub public_key_path: PathBuf,
    /// Lifetime of tokens issued at login
    pub token_ttl: Duration,
    pub lockout: LockoutPolicy,
    pub rate_limit: RateLimitConfig,
    /// Application-wide secret appended to every password before hashing
    pub password_pepper: Vec<u8>,
    pub hash_cost: HashCost,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            private_key_path: PathBuf::from("keys/private.pem"),
            public_key_path: PathBuf::from("keys/public.pem"),
            token_ttl: DEFAULT_TOKEN_TTL,
            lockout: LockoutPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            password_pepper: Vec::new(),
            hash_cost: HashCost::default(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("token_ttl", &self.token_ttl)
            .field("lockout", &self.lockout)
            .field("rate_limit", &self.rate_limit)
            .field("password_pepper", &"[REDACTED]")
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

impl AuthConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys take their defaults
    /// except `PASSWORD_PEPPER`, which is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let password_pepper = get("PASSWORD_PEPPER")
            .ok_or(ConfigError::Missing("PASSWORD_PEPPER"))?
            .into_bytes();

        let lockout = defaults.lockout;
        let rate_limit = &defaults.rate_limit;

        let token_minutes =
            parse_or(&get, "JWT_EXPIRATION_MINUTES", defaults.token_ttl.as_secs() / 60)?;
        let max_attempts = parse_or(&get, "AUTH_MAX_LOGIN_ATTEMPTS", lockout.max_attempts)?;
        let lockout_secs =
            parse_or(&get, "AUTH_LOCKOUT_SECONDS", lockout.lockout_duration.as_secs())?;
        let max_requests = parse_or(&get, "RATE_LIMIT_MAX_REQUESTS", rate_limit.max_requests)?;
        let window_secs =
            parse_or(&get, "RATE_LIMIT_WINDOW_SECONDS", rate_limit.window.as_secs())?;

        require_positive("JWT_EXPIRATION_MINUTES", token_minutes)?;
        require_positive("AUTH_MAX_LOGIN_ATTEMPTS", u64::from(max_attempts))?;
        require_positive("AUTH_LOCKOUT_SECONDS", lockout_secs)?;
        require_positive("RATE_LIMIT_MAX_REQUESTS", u64::from(max_requests))?;
        require_positive("RATE_LIMIT_WINDOW_SECONDS", window_secs)?;

        let token_secs = token_minutes
            .checked_mul(60)
            .ok_or_else(|| ConfigError::Invalid {
                key: "JWT_EXPIRATION_MINUTES",
                reason: format!("{token_minutes} minutes is out of range"),
            })?;

        let trusted_proxies = match get("TRUSTED_PROXIES") {
            Some(raw) => parse_ip_list("TRUSTED_PROXIES", &raw)?,
            None => Vec::new(),
        };

        let cost = defaults.hash_cost;
        let hash_cost = HashCost {
            memory_kib: parse_or(&get, "PASSWORD_HASH_MEMORY_KIB", cost.memory_kib)?,
            iterations: parse_or(&get, "PASSWORD_HASH_ITERATIONS", cost.iterations)?,
            parallelism: parse_or(&get, "PASSWORD_HASH_PARALLELISM", cost.parallelism)?,
        };

        Ok(Self {
            private_key_path: get("JWT_PRIVATE_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.private_key_path),
            public_key_path: get("JWT_PUBLIC_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_key_path),
            token_ttl: Duration::from_secs(token_secs),
            lockout: LockoutPolicy {
                max_attempts,
                lockout_duration: Duration::from_secs(lockout_secs),
            },
            rate_limit: RateLimitConfig::new(max_requests, window_secs)
                .with_trusted_proxies(trusted_proxies),
            password_pepper,
            hash_cost,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}

/// Comma-separated IP addresses; blank entries are skipped
fn parse_ip_list(key: &'static str, raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse().map_err(|e| ConfigError::Invalid {
                key,
                reason: format!("{entry:?}: {e}"),
            })
        })
        .collect()
}

fn require_positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
