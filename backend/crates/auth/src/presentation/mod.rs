//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::AuthAppState;
pub use middleware::{
    CurrentIdentity, rate_limit, require_admin, require_identity, require_roles, require_user,
};
pub use router::{auth_router, guarded};
