//! `User` persistence. TVM owns this table: it creates rows on first
//! `Exchange` for an unknown identity and refreshes email/name/avatar on
//! every subsequent exchange (spec §3 "last-writer-wins").
//!
//! Grounded on `storage::repositories::token`'s `#[async_trait]`
//! trait-plus-`SqlxFoo`-impl shape and `#[instrument(name = "db_xxx")]`
//! convention.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::domain::UserId;
use crate::errors::{Result, TvmError};
use crate::storage::DbPool;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn id(&self) -> UserId {
        UserId::new(self.id)
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create-or-get by `external_id`, refreshing email/name/avatar
    /// ("last-writer-wins", spec §3). Runs inside the caller's `Exchange`
    /// transaction — the single-transaction boundary spec §5 requires.
    async fn upsert(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        external_id: &str,
        email: &str,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<UserRow>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRow>>;
}

pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(name = "db_upsert_user", skip(self, tx), fields(external_id = %external_id))]
    async fn upsert(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        external_id: &str,
        email: &str,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<UserRow> {
        let existing: Option<UserRow> = sqlx::query_as(
            "SELECT id, external_id, email, name, avatar_url, created_at, updated_at FROM users WHERE external_id = ?",
        )
        .bind(external_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| TvmError::database(e, "failed to look up user by external_id"))?;

        if existing.is_some() {
            sqlx::query(
                "UPDATE users SET email = ?, name = ?, avatar_url = ?, updated_at = CURRENT_TIMESTAMP WHERE external_id = ?",
            )
            .bind(email)
            .bind(name)
            .bind(avatar_url)
            .bind(external_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| TvmError::database(e, "failed to refresh existing user"))?;
        } else {
            sqlx::query(
                "INSERT INTO users (external_id, email, name, avatar_url) VALUES (?, ?, ?, ?)",
            )
            .bind(external_id)
            .bind(email)
            .bind(name)
            .bind(avatar_url)
            .execute(&mut **tx)
            .await
            .map_err(|e| TvmError::database(e, "failed to insert new user"))?;
        }

        sqlx::query_as(
            "SELECT id, external_id, email, name, avatar_url, created_at, updated_at FROM users WHERE external_id = ?",
        )
        .bind(external_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| TvmError::database(e, "failed to re-read upserted user"))
    }

    #[instrument(name = "db_find_user_by_id", skip(self), fields(user_id = %user_id))]
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRow>> {
        sqlx::query_as(
            "SELECT id, external_id, email, name, avatar_url, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(user_id.inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TvmError::database(e, "failed to find user by id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::TestDatabase;

    #[tokio::test]
    async fn upsert_creates_then_refreshes_on_second_exchange() {
        let db = TestDatabase::new().await;
        let repo = SqlxUserRepository::new(db.pool.clone());

        let mut tx = db.pool.begin().await.unwrap();
        let first = repo.upsert(&mut tx, "email:a@example.com", "a@example.com", Some("Alice"), None).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(first.email, "a@example.com");
        assert_eq!(first.name.as_deref(), Some("Alice"));

        let mut tx = db.pool.begin().await.unwrap();
        let second = repo
            .upsert(&mut tx, "email:a@example.com", "a@example.com", Some("Alice Updated"), Some("https://x/a.png"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.name.as_deref(), Some("Alice Updated"));
        assert_eq!(second.avatar_url.as_deref(), Some("https://x/a.png"));
    }
}
