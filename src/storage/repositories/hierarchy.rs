//! The hierarchy oracle (spec §3/§9) backed by the platform-owned
//! `organizations`/`workspaces`/`resources` tables. TVM reads these; it
//! never creates, updates, or deletes them, so this repository exposes
//! only the two lookups [`HierarchyOracle`] names.

use async_trait::async_trait;
use tracing::instrument;

use crate::authz::HierarchyOracle;
use crate::domain::{OrganizationId, ResourceId, WorkspaceId};
use crate::errors::VendingError;
use crate::storage::DbPool;

pub struct SqlxHierarchyRepository {
    pool: DbPool,
}

impl SqlxHierarchyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HierarchyOracle for SqlxHierarchyRepository {
    #[instrument(name = "db_workspace_org", skip(self), fields(workspace_id = %workspace))]
    async fn workspace_org(&self, workspace: WorkspaceId) -> Result<OrganizationId, VendingError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT organization_id FROM workspaces WHERE id = ?")
                .bind(workspace.inner())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VendingError::transient(format!("workspace_org lookup failed: {e}")))?;

        row.map(|(org,)| OrganizationId::new(org))
            .ok_or_else(|| VendingError::transient(format!("dangling workspace reference: {workspace}")))
    }

    #[instrument(name = "db_resource_workspace", skip(self), fields(resource_id = %resource))]
    async fn resource_workspace(&self, resource: ResourceId) -> Result<WorkspaceId, VendingError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT workspace_id FROM resources WHERE id = ?")
                .bind(resource.inner())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VendingError::transient(format!("resource_workspace lookup failed: {e}")))?;

        row.map(|(workspace,)| WorkspaceId::new(workspace))
            .ok_or_else(|| VendingError::transient(format!("dangling resource reference: {resource}")))
    }
}
