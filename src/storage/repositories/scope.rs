//! Persisted `UserScope` grants (spec §3), backing both the live
//! [`crate::authz::resolver::GrantSource`] and `UpdateMemberRoles`'s
//! idempotent add/remove (spec §4.5, property P5).

use async_trait::async_trait;
use tracing::instrument;

use crate::domain::{EntityScope, EntityType, Scope, UserId};
use crate::errors::{Result, TvmError, VendingError};

#[async_trait]
pub trait UserScopeRepository: Send + Sync {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<EntityScope>>;

    /// Idempotent: granting a scope the user already holds is a no-op
    /// success, never a conflict (spec §4.5 P5).
    async fn add(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: UserId,
        scope: EntityScope,
    ) -> Result<()>;

    /// Idempotent: revoking a scope the user doesn't hold is a no-op
    /// success.
    async fn remove(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: UserId,
        scope: EntityScope,
    ) -> Result<()>;
}

pub struct SqlxUserScopeRepository {
    pool: crate::storage::DbPool,
}

impl SqlxUserScopeRepository {
    pub fn new(pool: crate::storage::DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserScopeRepository for SqlxUserScopeRepository {
    #[instrument(name = "db_list_user_scopes", skip(self), fields(user_id = %user_id))]
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<EntityScope>> {
        let rows: Vec<(EntityType, i64, Scope)> = sqlx::query_as(
            "SELECT entity_type, entity_id, scope FROM user_scopes WHERE user_id = ?",
        )
        .bind(user_id.inner())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TvmError::database(e, "failed to list user scopes"))?;

        Ok(rows.into_iter().map(|(entity_type, entity_id, scope)| EntityScope::new(entity_type, entity_id, scope)).collect())
    }

    #[instrument(name = "db_add_user_scope", skip(self, tx), fields(user_id = %user_id, scope = %scope))]
    async fn add(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: UserId,
        scope: EntityScope,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_scopes (user_id, scope, entity_type, entity_id) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id.inner())
        .bind(scope.scope)
        .bind(scope.entity_type)
        .bind(scope.entity_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| TvmError::database(e, "failed to add user scope"))?;

        Ok(())
    }

    #[instrument(name = "db_remove_user_scope", skip(self, tx), fields(user_id = %user_id, scope = %scope))]
    async fn remove(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: UserId,
        scope: EntityScope,
    ) -> Result<()> {
        sqlx::query(
            "DELETE FROM user_scopes WHERE user_id = ? AND scope = ? AND entity_type = ? AND entity_id = ?",
        )
        .bind(user_id.inner())
        .bind(scope.scope)
        .bind(scope.entity_type)
        .bind(scope.entity_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| TvmError::database(e, "failed to remove user scope"))?;

        Ok(())
    }
}

/// Bridges storage to [`crate::authz::resolver::GrantSource`] — storage
/// errors become `VendingError::Transient` at this boundary, per spec §7's
/// "all domain decisions return either Granted or InsufficientPermissions".
#[async_trait]
impl crate::authz::GrantSource for SqlxUserScopeRepository {
    async fn grants_for_user(&self, user_id: UserId) -> std::result::Result<Vec<EntityScope>, VendingError> {
        self.list_for_user(user_id).await.map_err(VendingError::from)
    }
}
