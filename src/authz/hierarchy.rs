//! The hierarchical-inheritance half of C2 (spec §4.2) plus the ancestor
//! walk C3 uses (spec §4.3 step 3).
//!
//! Grounded on the teacher's `auth::authorization`, whose
//! `parse_team_from_scope`/`parse_org_from_scope` walk a *string*-encoded
//! scope hierarchy to climb from a team up to its org. This module
//! generalizes that walking idiom to the typed `EntityType` lattice spec §9
//! demands: a two-method oracle trait (`workspace_org`, `resource_workspace`)
//! plus a pure function over it, so the resolver stays testable against an
//! in-memory oracle instead of a live database.

use async_trait::async_trait;

use crate::domain::{EntityType, OrganizationId, ResourceId, WorkspaceId};
use crate::errors::VendingError;

/// The hierarchy oracle spec §9 names: two lookups, nothing else.
///
/// `system ⊇ organization ⊇ workspace ⊇ resource`; `user` only ever climbs
/// straight to `system` (spec §4.3: "system overrides every user scope").
#[async_trait]
pub trait HierarchyOracle: Send + Sync {
    /// `workspace → org`. A dangling reference (spec §4.3) must be surfaced
    /// as `VendingError::Transient`, not silent denial.
    async fn workspace_org(&self, workspace: WorkspaceId) -> Result<OrganizationId, VendingError>;

    /// `resource → workspace`. Same dangling-reference rule as above.
    async fn resource_workspace(&self, resource: ResourceId) -> Result<WorkspaceId, VendingError>;
}

/// Ordered ancestor chain of `(entity_type, entity_id)`, nearest first,
/// always terminating at `(system, 0)` except when `entity_type` already
/// *is* `system` (which has no ancestors).
pub async fn ancestors(
    entity_type: EntityType,
    entity_id: i64,
    oracle: &dyn HierarchyOracle,
) -> Result<Vec<(EntityType, i64)>, VendingError> {
    let mut chain = Vec::new();

    match entity_type {
        EntityType::System => {}
        EntityType::Organization => {
            chain.push((EntityType::System, 0));
        }
        EntityType::Workspace => {
            let org = oracle.workspace_org(WorkspaceId::new(entity_id)).await?;
            chain.push((EntityType::Organization, org.inner()));
            chain.push((EntityType::System, 0));
        }
        EntityType::Resource => {
            let workspace = oracle.resource_workspace(ResourceId::new(entity_id)).await?;
            let org = oracle.workspace_org(workspace).await?;
            chain.push((EntityType::Workspace, workspace.inner()));
            chain.push((EntityType::Organization, org.inner()));
            chain.push((EntityType::System, 0));
        }
        EntityType::User => {
            chain.push((EntityType::System, 0));
        }
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeOracle {
        workspace_to_org: HashMap<i64, i64>,
        resource_to_workspace: HashMap<i64, i64>,
    }

    #[async_trait]
    impl HierarchyOracle for FakeOracle {
        async fn workspace_org(&self, workspace: WorkspaceId) -> Result<OrganizationId, VendingError> {
            self.workspace_to_org
                .get(&workspace.inner())
                .map(|o| OrganizationId::new(*o))
                .ok_or_else(|| VendingError::transient("dangling workspace"))
        }

        async fn resource_workspace(&self, resource: ResourceId) -> Result<WorkspaceId, VendingError> {
            self.resource_to_workspace
                .get(&resource.inner())
                .map(|w| WorkspaceId::new(*w))
                .ok_or_else(|| VendingError::transient("dangling resource"))
        }
    }

    fn fixture() -> FakeOracle {
        FakeOracle {
            workspace_to_org: HashMap::from([(1, 1), (2, 1), (3, 2)]),
            resource_to_workspace: HashMap::from([(1, 1), (2, 1), (3, 2), (4, 2), (5, 3)]),
        }
    }

    #[tokio::test]
    async fn resource_ancestors_climb_through_workspace_org_system() {
        let oracle = fixture();
        let chain = ancestors(EntityType::Resource, 4, &oracle).await.unwrap();
        assert_eq!(
            chain,
            vec![(EntityType::Workspace, 2), (EntityType::Organization, 1), (EntityType::System, 0)]
        );
    }

    #[tokio::test]
    async fn organization_ancestors_is_just_system() {
        let oracle = fixture();
        let chain = ancestors(EntityType::Organization, 1, &oracle).await.unwrap();
        assert_eq!(chain, vec![(EntityType::System, 0)]);
    }

    #[tokio::test]
    async fn system_has_no_ancestors() {
        let oracle = fixture();
        let chain = ancestors(EntityType::System, 0, &oracle).await.unwrap();
        assert!(chain.is_empty());
    }

    #[tokio::test]
    async fn dangling_resource_is_transient_not_silent_denial() {
        let oracle = fixture();
        let result = ancestors(EntityType::Resource, 999, &oracle).await;
        assert!(matches!(result, Err(VendingError::Transient { .. })));
    }
}
