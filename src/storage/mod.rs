//! Storage and persistence: connection pooling, migrations, and the
//! repository layer backing C3's grant source and C4's token store.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub mod test_helpers;

pub use migrations::{
    get_migration_version, list_applied_migrations, run_migrations as run_db_migrations,
    validate_migrations, MigrationInfo,
};
pub use pool::{create_pool, get_pool_stats, DbPool, PoolStats};
pub use repositories::{
    SqlxHierarchyRepository, SqlxTokenRepository, SqlxUserRepository, SqlxUserScopeRepository,
    TokenMetadata, TokenRepository, TokenRow, UserRepository, UserRow, UserScopeRepository,
};

use crate::errors::{Result, TvmError};

pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| TvmError::Database { source: e, context: "database connectivity check failed".to_string() })?;

    Ok(())
}
