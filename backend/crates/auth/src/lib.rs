//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Identity entity, lockout state, token claims, repository trait
//! - `application/` - Authenticator, account guard, identity resolver, access policy
//! - `infra/` - RS256 token codec, PostgreSQL and in-memory identity stores
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Email/password login issuing short-lived RS256 bearer tokens
//! - Per-email lockout after repeated failures
//! - Per-client sliding-window rate limiting
//! - Role gates evaluated against the live identity record
//!
//! ## Security Model
//! - Passwords hashed with peppered Argon2id
//! - Tokens verified for signature and expiry; `alg` pinned to RS256
//! - Locked accounts answer exactly like bad credentials

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::{
    AccessPolicy, AccountGuard, AuthConfig, Authenticator, ConfigError, LockoutStore,
    RequestIdentityResolver,
};
pub use domain::{Claims, Email, Identity, IdentityRepository, LockoutPolicy, UserRole};
pub use error::{AuthError, AuthResult};
pub use infra::{InMemoryIdentityRepository, PgIdentityRepository, TokenCodec, TokenError};
pub use presentation::{AuthAppState, CurrentIdentity, auth_router, guarded};

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
