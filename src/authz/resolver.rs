//! Permission Resolver (C3), spec §4.3.
//!
//! One pure decision function, [`decide`], shared by two call sites: the
//! live resolver (grants sourced from the persisted `UserScopeRepository`)
//! and the `Verify` hot path (grants sourced from a token's frozen
//! snapshot). [`resolve_with_grants`] adds the self-short-circuit and the
//! ancestor walk around `decide`, so both callers get identical semantics
//! without duplicating the algorithm.

use async_trait::async_trait;

use crate::authz::hierarchy::{ancestors, HierarchyOracle};
use crate::domain::{EntityScope, EntityType, Scope, UserId};
use crate::errors::VendingError;

/// Outcome of a permission check. Storage/hierarchy failures are not a
/// variant here — they propagate as `Err(VendingError::Transient)`, per
/// spec §4.3's "storage errors propagate as TransientError; all domain
/// decisions return either Granted or InsufficientPermissions."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted,
    InsufficientPermissions,
}

impl Decision {
    pub const fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted)
    }
}

/// Pure scope-algebra decision: does any grant in `grants`, held either on
/// `target`'s own entity or on one of `ancestors`, dominate `target.scope`
/// under implication?
///
/// No I/O, no knowledge of *who* is asking — `resolve_with_grants` layers
/// the self-short-circuit and the ancestor walk on top of this.
pub fn decide(grants: &[EntityScope], target: EntityScope, ancestor_chain: &[(EntityType, i64)]) -> bool {
    let satisfied_by = |entity_type: EntityType, entity_id: i64| {
        grants.iter().any(|grant| {
            grant.entity_type == entity_type
                && grant.entity_id == entity_id
                && grant.scope.implies(target.scope)
        })
    };

    satisfied_by(target.entity_type, target.entity_id)
        || ancestor_chain.iter().any(|(entity_type, entity_id)| satisfied_by(*entity_type, *entity_id))
}

/// Applies the self-short-circuit (spec §4.3 step 1) and the ancestor walk
/// (step 3) around [`decide`]. Both the live [`Resolver`] and the token
/// `Verify` hot path route through this so the algorithm is proven once.
pub async fn resolve_with_grants(
    user_id: UserId,
    grants: &[EntityScope],
    target: EntityScope,
    oracle: &dyn HierarchyOracle,
) -> Result<Decision, VendingError> {
    target.validate()?;

    if target.entity_type == EntityType::User && target.entity_id == user_id.inner() && target.scope == Scope::Read
    {
        return Ok(Decision::Granted);
    }

    let chain = ancestors(target.entity_type, target.entity_id, oracle).await?;

    Ok(if decide(grants, target, &chain) { Decision::Granted } else { Decision::InsufficientPermissions })
}

/// Source of a user's *persisted* grants, for the live resolver path.
/// Implemented by [`crate::storage::repositories::scope::SqlxUserScopeRepository`].
#[async_trait]
pub trait GrantSource: Send + Sync {
    async fn grants_for_user(&self, user_id: UserId) -> Result<Vec<EntityScope>, VendingError>;
}

/// Live permission resolver: consults the persistent `UserScope` store
/// directly, as opposed to `Verify`'s token-snapshot path.
pub struct Resolver<'a> {
    pub grants: &'a dyn GrantSource,
    pub oracle: &'a dyn HierarchyOracle,
}

impl<'a> Resolver<'a> {
    pub fn new(grants: &'a dyn GrantSource, oracle: &'a dyn HierarchyOracle) -> Self {
        Self { grants, oracle }
    }

    /// `Resolve(user_id, target) → Granted | InsufficientPermissions | TransientError`.
    pub async fn resolve(&self, user_id: UserId, target: EntityScope) -> Result<Decision, VendingError> {
        let grants = self.grants.grants_for_user(user_id).await?;
        resolve_with_grants(user_id, &grants, target, self.oracle).await
    }

    /// Whether `actor` has `admin` on `entity` or an ancestor of it —
    /// the gating rule spec §4.5 requires for every scope in `add ∪ remove`.
    pub async fn has_admin_on(
        &self,
        actor: UserId,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<bool, VendingError> {
        let target = EntityScope::new(entity_type, entity_id, Scope::Admin);
        Ok(self.resolve(actor, target).await?.is_granted())
    }
}
