//! Token Store (C4, spec §4.4).
//!
//! The opaque token string is the primary key; `scopes` is the frozen
//! snapshot captured at issue time and is never rewritten after insert
//! (spec §3 invariant 4). Grounded on the teacher's
//! `storage::repositories::token` `#[async_trait]` trait-plus-`SqlxFoo`
//! shape and its `#[instrument(name = "db_xxx")]` convention.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::instrument;

use crate::domain::{EntityScope, EntityType};
use crate::errors::{Result, TvmError};
use crate::storage::DbPool;

/// A full token row, including the snapshot — only ever read by `Verify`
/// and the revocation paths, never returned over the wire.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub token: String,
    pub name: Option<String>,
    pub scopes: Json<Vec<EntityScope>>,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TokenRow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn snapshot(&self) -> &[EntityScope] {
        &self.scopes.0
    }
}

/// Metadata returned by `ListTokens` — never the raw token string
/// (spec §4.4: "returns name, subject, expiry, never the raw token string").
#[derive(Debug, Clone, FromRow)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// `Insert(token, snapshot, subject, expires_at) -> OK | Duplicate`.
    /// Returns `true` on insert, `false` on a primary-key collision — the
    /// caller (C5) is responsible for retrying with fresh entropy.
    #[allow(clippy::too_many_arguments)]
    async fn insert(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        token: &str,
        name: Option<&str>,
        snapshot: &[EntityScope],
        entity_type: EntityType,
        entity_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn lookup(&self, token: &str) -> Result<Option<TokenRow>>;

    /// Revocation keyed on the human name attached by admin-issued tokens.
    async fn delete_by_name(&self, name: &str, entity_type: EntityType, entity_id: i64) -> Result<bool>;

    /// Revoke-by-string path spec §4.4 names for nameless login tokens.
    async fn delete_by_token(&self, token: &str) -> Result<bool>;

    /// Invalidate every outstanding token for a subject, inside the same
    /// transaction as the scope mutation that caused it (`UpdateMemberRoles`).
    async fn delete_all_for_subject(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<u64>;

    async fn list_by_subject(&self, entity_type: EntityType, entity_id: i64) -> Result<Vec<TokenMetadata>>;

    /// Callable by a background sweeper; returns the number of rows purged.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlxTokenRepository {
    pool: DbPool,
}

impl SqlxTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    #[instrument(name = "db_insert_token", skip(self, tx, snapshot), fields(entity_type = %entity_type, entity_id = entity_id))]
    async fn insert(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        token: &str,
        name: Option<&str>,
        snapshot: &[EntityScope],
        entity_type: EntityType,
        entity_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let scopes = Json(snapshot.to_vec());

        let result = sqlx::query(
            "INSERT OR IGNORE INTO tokens (token, name, scopes, entity_type, entity_id, expires_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(token)
        .bind(name)
        .bind(scopes)
        .bind(entity_type)
        .bind(entity_id)
        .bind(expires_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| TvmError::database(e, "failed to insert token"))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(name = "db_lookup_token", skip(self, token))]
    async fn lookup(&self, token: &str) -> Result<Option<TokenRow>> {
        sqlx::query_as(
            "SELECT token, name, scopes, entity_type, entity_id, expires_at, created_at FROM tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TvmError::database(e, "failed to look up token"))
    }

    #[instrument(name = "db_delete_token_by_name", skip(self), fields(name = %name, entity_type = %entity_type, entity_id = entity_id))]
    async fn delete_by_name(&self, name: &str, entity_type: EntityType, entity_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tokens WHERE name = ? AND entity_type = ? AND entity_id = ?")
            .bind(name)
            .bind(entity_type)
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .map_err(|e| TvmError::database(e, "failed to revoke token by name"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db_delete_token_by_string", skip(self, token))]
    async fn delete_by_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| TvmError::database(e, "failed to revoke token"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db_delete_all_tokens_for_subject", skip(self, tx), fields(entity_type = %entity_type, entity_id = entity_id))]
    async fn delete_all_for_subject(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tokens WHERE entity_type = ? AND entity_id = ?")
            .bind(entity_type)
            .bind(entity_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| TvmError::database(e, "failed to invalidate tokens for subject"))?;

        Ok(result.rows_affected())
    }

    #[instrument(name = "db_list_tokens_by_subject", skip(self), fields(entity_type = %entity_type, entity_id = entity_id))]
    async fn list_by_subject(&self, entity_type: EntityType, entity_id: i64) -> Result<Vec<TokenMetadata>> {
        sqlx::query_as(
            "SELECT name, entity_type, entity_id, expires_at, created_at FROM tokens WHERE entity_type = ? AND entity_id = ? ORDER BY created_at DESC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TvmError::database(e, "failed to list tokens for subject"))
    }

    #[instrument(name = "db_purge_expired_tokens", skip(self))]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| TvmError::database(e, "failed to purge expired tokens"))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Scope;
    use crate::storage::test_helpers::TestDatabase;
    use chrono::Duration;

    fn snapshot() -> Vec<EntityScope> {
        vec![EntityScope::new(EntityType::Organization, 1, Scope::Admin)]
    }

    #[tokio::test]
    async fn insert_then_lookup_round_trips_the_snapshot() {
        let db = TestDatabase::new().await;
        let repo = SqlxTokenRepository::new(db.pool.clone());
        let expires_at = Utc::now() + Duration::hours(1);

        let mut tx = db.pool.begin().await.unwrap();
        let inserted =
            repo.insert(&mut tx, "tok-1", None, &snapshot(), EntityType::User, 1, expires_at).await.unwrap();
        tx.commit().await.unwrap();
        assert!(inserted);

        let row = repo.lookup("tok-1").await.unwrap().unwrap();
        assert_eq!(row.snapshot(), snapshot().as_slice());
        assert_eq!(row.entity_id, 1);
    }

    #[tokio::test]
    async fn duplicate_token_string_is_reported_not_overwritten() {
        let db = TestDatabase::new().await;
        let repo = SqlxTokenRepository::new(db.pool.clone());
        let expires_at = Utc::now() + Duration::hours(1);

        let mut tx = db.pool.begin().await.unwrap();
        assert!(repo.insert(&mut tx, "dup", None, &snapshot(), EntityType::User, 1, expires_at).await.unwrap());
        let second = repo.insert(&mut tx, "dup", None, &[], EntityType::User, 2, expires_at).await.unwrap();
        tx.commit().await.unwrap();

        assert!(!second, "second insert with the same token string must report Duplicate");
    }

    #[tokio::test]
    async fn delete_all_for_subject_invalidates_every_token() {
        let db = TestDatabase::new().await;
        let repo = SqlxTokenRepository::new(db.pool.clone());
        let expires_at = Utc::now() + Duration::hours(1);

        let mut tx = db.pool.begin().await.unwrap();
        repo.insert(&mut tx, "tok-a", None, &snapshot(), EntityType::User, 5, expires_at).await.unwrap();
        repo.insert(&mut tx, "tok-b", Some("admin-issued"), &snapshot(), EntityType::User, 5, expires_at)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        let purged = repo.delete_all_for_subject(&mut tx, EntityType::User, 5).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(purged, 2);
        assert!(repo.lookup("tok-a").await.unwrap().is_none());
        assert!(repo.lookup("tok-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_expired_removes_only_past_expiry() {
        let db = TestDatabase::new().await;
        let repo = SqlxTokenRepository::new(db.pool.clone());

        let mut tx = db.pool.begin().await.unwrap();
        repo.insert(&mut tx, "expired", None, &[], EntityType::User, 1, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        repo.insert(&mut tx, "fresh", None, &[], EntityType::User, 1, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let purged = repo.purge_expired(Utc::now()).await.unwrap();
        assert_eq!(purged, 1);
        assert!(repo.lookup("expired").await.unwrap().is_none());
        assert!(repo.lookup("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_by_subject_never_returns_the_raw_token_string() {
        let db = TestDatabase::new().await;
        let repo = SqlxTokenRepository::new(db.pool.clone());
        let expires_at = Utc::now() + Duration::hours(1);

        let mut tx = db.pool.begin().await.unwrap();
        repo.insert(&mut tx, "tok-named", Some("ci-bot"), &[], EntityType::User, 9, expires_at).await.unwrap();
        tx.commit().await.unwrap();

        let listed = repo.list_by_subject(EntityType::User, 9).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name.as_deref(), Some("ci-bot"));
    }
}
