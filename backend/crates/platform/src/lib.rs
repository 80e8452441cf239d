//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no knowledge of accounts or roles:
//! - Password hashing with pepper and strength assessment (Argon2id)
//! - In-memory sliding-window rate limiting
//! - Client address and bearer credential extraction from request headers

pub mod client;
pub mod password;
pub mod rate_limit;
