//! The entity-type lattice and scope-implication order (C2, spec §4.2).
//!
//! Two orthogonal rules make up authorization in this crate: implication
//! (within one entity, `admin` implies `write` implies `read`) and
//! hierarchical inheritance (across entities, a grant on a parent implies
//! the same grant on every descendant). This module owns the first rule and
//! the vocabulary the second is built from; [`crate::authz::hierarchy`] owns
//! the walk itself.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::errors::VendingError;

/// The closed set of entity kinds a scope can be granted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    System,
    Organization,
    Workspace,
    Resource,
    User,
}

impl EntityType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityType::System => "system",
            EntityType::Organization => "organization",
            EntityType::Workspace => "workspace",
            EntityType::Resource => "resource",
            EntityType::User => "user",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = VendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(EntityType::System),
            "organization" => Ok(EntityType::Organization),
            "workspace" => Ok(EntityType::Workspace),
            "resource" => Ok(EntityType::Resource),
            "user" => Ok(EntityType::User),
            other => Err(VendingError::InvalidArgument {
                message: format!("unknown entity type '{other}'"),
            }),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for EntityType {
    fn type_info() -> <sqlx::Sqlite as sqlx::Database>::TypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for EntityType {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for EntityType {
    fn decode(
        value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

/// The closed, totally-ordered set of grant strengths: `read < write < admin`.
///
/// `Ord` is written by hand rather than derived: derive-order happens to
/// coincide with declaration order here, but the ordering is the load-bearing
/// part of this type and deserves to be explicit rather than incidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Read,
    Write,
    Admin,
}

impl Scope {
    const fn rank(&self) -> u8 {
        match self {
            Scope::Read => 0,
            Scope::Write => 1,
            Scope::Admin => 2,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Scope::Read => "read",
            Scope::Write => "write",
            Scope::Admin => "admin",
        }
    }

    /// Whether holding `self` satisfies a request for `requested`.
    pub const fn implies(&self, requested: Scope) -> bool {
        self.rank() >= requested.rank()
    }
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = VendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Scope::Read),
            "write" => Ok(Scope::Write),
            "admin" => Ok(Scope::Admin),
            other => Err(VendingError::InvalidArgument {
                message: format!("unknown scope '{other}'"),
            }),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for Scope {
    fn type_info() -> <sqlx::Sqlite as sqlx::Database>::TypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Scope {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Scope {
    fn decode(
        value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

/// The atomic unit of authorization: a `(entity_type, entity_id, scope)` triple.
///
/// `entity_id` is conventionally `0` for `EntityType::System`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct EntityScope {
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub scope: Scope,
}

impl EntityScope {
    pub const fn new(entity_type: EntityType, entity_id: i64, scope: Scope) -> Self {
        Self { entity_type, entity_id, scope }
    }

    /// Validates the `(system, 0)` convention named in spec §4.3: a target
    /// id of `0` is only legal for the `system` entity type.
    pub fn validate(&self) -> Result<(), VendingError> {
        if self.entity_id == 0 && !matches!(self.entity_type, EntityType::System) {
            return Err(VendingError::InvalidArgument {
                message: format!(
                    "entity_id 0 is only valid for entity_type system, got {}",
                    self.entity_type
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for EntityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.entity_type, self.entity_id, self.scope)
    }
}
