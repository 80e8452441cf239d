//! Infrastructure Layer
//!
//! Identity stores and the token codec.

pub mod jwt;
pub mod memory;
pub mod postgres;

pub use jwt::{IssuedToken, TokenCodec, TokenError};
pub use memory::InMemoryIdentityRepository;
pub use postgres::PgIdentityRepository;
