//! Domain Layer
//!
//! Entities, value objects, and the identity lookup trait.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{claims::Claims, identity::Identity, lockout::LockoutPolicy};
pub use repository::IdentityRepository;
pub use value_object::{email::Email, user_role::UserRole};
