//! Shared Kernel - Vocabulary shared by every backend crate
//!
//! Kept deliberately small:
//! - Unified application error ([`error::app_error::AppError`]) and its
//!   HTTP-facing classification ([`error::kind::ErrorKind`])
//! - Typed identifiers ([`id::Id`])
//!
//! Anything that only one bounded context cares about belongs in that
//! context's crate, not here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
