//! Repository layer: one module per persisted entity, each a small
//! `#[async_trait]` trait plus a `Sqlx`-prefixed production implementation,
//! the shape the teacher uses throughout `storage::repositories`.

pub mod hierarchy;
pub mod scope;
pub mod token;
pub mod user;

pub use hierarchy::SqlxHierarchyRepository;
pub use scope::{SqlxUserScopeRepository, UserScopeRepository};
pub use token::{SqlxTokenRepository, TokenMetadata, TokenRepository, TokenRow};
pub use user::{SqlxUserRepository, UserRepository, UserRow};
