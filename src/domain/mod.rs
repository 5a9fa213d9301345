//! Domain layer: pure types with zero infrastructure dependencies.
//!
//! - `id`: type-safe, `i64`-backed identifiers (`UserId`, `OrganizationId`, ...)
//! - `scope`: the entity-type lattice and the `read < write < admin` order (C2)

pub mod id;
pub mod scope;

pub use id::{OrganizationId, ResourceId, UserId, WorkspaceId};
pub use scope::{EntityScope, EntityType, Scope};
