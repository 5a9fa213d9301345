//! # TVM
//!
//! TVM is a Token Vending Machine: an authorization kernel that exchanges
//! identity assertions for scoped, opaque bearer tokens. It answers one
//! question — "can this token do X on this entity?" — and nothing else;
//! it is not an OAuth provider, a session store, or a policy engine.
//!
//! ## Architecture
//!
//! Five components, each independently testable:
//!
//! ```text
//! Identity Providers → Vending Machine → Permission Resolver → Hierarchy Oracle
//!   (C1, identity)       (C5, orchestrator)   (C3, authz)         (C2/authz, hierarchy)
//!                              ↓
//!                        Token Store (C4, storage)
//! ```
//!
//! - **Identity Providers** ([`identity`]): normalize a login payload
//!   (email, GitHub OAuth token) into a canonical external identity.
//! - **Scope Algebra & Permission Resolver** ([`authz`]): the
//!   `read < write < admin` order and the ancestor walk that decides
//!   whether a token's frozen grant snapshot satisfies a requested scope.
//! - **Token Store** ([`storage`]): SQLite-backed repositories for users,
//!   persisted grants, and opaque tokens.
//! - **Vending Machine** ([`vending`]): orchestrates `Exchange`, `Verify`,
//!   `UpdateMemberRoles`, `Revoke`, and `ListTokens` across the above.
//! - **HTTP surface** ([`api`]): the wire protocol for all five methods.

pub mod api;
pub mod authz;
pub mod config;
pub mod domain;
pub mod errors;
pub mod identity;
pub mod observability;
pub mod storage;
pub mod vending;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Result, TvmError, VendingError};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_looks_like_semver() {
        let components: Vec<_> = VERSION.split('.').collect();
        assert!(components.len() >= 3, "version should follow semver: {VERSION}");
        assert!(components.iter().all(|part| !part.is_empty()));
        assert_eq!(APP_NAME, "tvm");
    }
}
