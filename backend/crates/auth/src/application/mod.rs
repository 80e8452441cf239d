//! Application Layer
//!
//! Use cases and application services.

pub mod access_policy;
pub mod account_guard;
pub mod audit;
pub mod authenticate;
pub mod config;
pub mod resolve_identity;

// Re-exports
pub use access_policy::AccessPolicy;
pub use account_guard::{AccountGuard, LockoutStore};
pub use authenticate::{Authenticator, LoginOutput};
pub use config::{AuthConfig, ConfigError};
pub use resolve_identity::RequestIdentityResolver;
