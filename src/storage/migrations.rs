//! Database migration management.
//!
//! Filesystem-based `.sql` migrations tracked in a `_tvm_migrations` table,
//! run transactionally via `sqlx::raw_sql` — the same shape as the
//! teacher's `storage::migrations`, rebased onto SQLite types (`BLOB`
//! instead of `BYTEA`, `TEXT` instead of `TIMESTAMPTZ`).

use crate::errors::{Result, TvmError};
use crate::storage::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
    pub installed_on: chrono::DateTime<chrono::Utc>,
    pub execution_time: i64,
    pub checksum: Vec<u8>,
}

fn get_migrations_dir() -> std::path::PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let migrations_dir = cwd.join("migrations");

    if migrations_dir.exists() {
        migrations_dir
    } else {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        exe_dir.join("migrations")
    }
}

fn load_migrations() -> Result<Vec<(String, String)>> {
    let migrations_dir = get_migrations_dir();

    if !migrations_dir.exists() {
        return Err(TvmError::validation(format!(
            "migrations directory not found: {}",
            migrations_dir.display()
        )));
    }

    let mut migrations = Vec::new();
    let entries = std::fs::read_dir(&migrations_dir).map_err(|e| {
        TvmError::validation(format!("failed to read migrations directory {}: {e}", migrations_dir.display()))
    })?;

    for entry in entries {
        let entry = entry
            .map_err(|e| TvmError::validation(format!("failed to read migration file entry: {e}")))?;

        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("sql") {
            let filename = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| TvmError::validation(format!("invalid migration filename: {}", path.display())))?;

            let content = std::fs::read_to_string(&path)
                .map_err(|e| TvmError::validation(format!("failed to read migration file {}: {e}", path.display())))?;

            migrations.push((filename.to_string(), content));
        }
    }

    migrations.sort_by(|a, b| a.0.cmp(&b.0));

    if migrations.is_empty() {
        return Err(TvmError::validation(format!("no migration files found in {}", migrations_dir.display())));
    }

    info!(count = migrations.len(), dir = %migrations_dir.display(), "loaded migration files");
    Ok(migrations)
}

/// Run all pending migrations, in one transaction per file.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("starting database migration process");

    create_migration_table(pool).await?;

    let migrations = load_migrations()?;
    let applied = get_applied_migration_versions(pool).await?;

    let mut migrations_run = 0;
    for (filename, sql) in &migrations {
        let version = extract_version_from_filename(filename)?;

        if applied.contains(&version) {
            info!(version, "migration already applied: {filename}");
            continue;
        }

        info!(version, "running migration: {filename}");
        let start_time = std::time::Instant::now();

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| TvmError::database(e, "failed to start migration transaction"))?;

        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, migration = filename, "migration failed");
            TvmError::database(e, format!("migration failed: {filename}"))
        })?;

        let execution_time = start_time.elapsed().as_millis() as i64;
        let checksum = calculate_checksum(sql);
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO _tvm_migrations (version, description, checksum, execution_time, installed_on) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(version)
        .bind(filename)
        .bind(&checksum)
        .bind(execution_time)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, migration = filename, "failed to record migration");
            TvmError::database(e, format!("failed to record migration: {filename}"))
        })?;

        tx.commit().await.map_err(|e| TvmError::database(e, "failed to commit migration transaction"))?;

        migrations_run += 1;
        info!(version, execution_time_ms = execution_time, "migration completed: {filename}");
    }

    if migrations_run > 0 {
        info!(count = migrations_run, "database migrations completed");
    } else {
        info!("no pending migrations");
    }

    Ok(())
}

async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _tvm_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL,
            checksum BLOB NOT NULL,
            execution_time BIGINT NOT NULL,
            installed_on TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| TvmError::database(e, "failed to create migration tracking table"))?;

    Ok(())
}

async fn get_applied_migration_versions(pool: &DbPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT version FROM _tvm_migrations ORDER BY version").fetch_all(pool).await;

    match rows {
        Ok(rows) => Ok(rows.into_iter().map(|row| row.get::<i64, _>("version")).collect()),
        Err(e) => Err(TvmError::database(e, "failed to get applied migrations")),
    }
}

fn extract_version_from_filename(filename: &str) -> Result<i64> {
    let version_str = filename
        .split('_')
        .next()
        .ok_or_else(|| TvmError::validation(format!("invalid migration filename: {filename}")))?;

    version_str.parse::<i64>().map_err(|_| TvmError::validation(format!("invalid version in filename: {filename}")))
}

fn calculate_checksum(content: &str) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish().to_le_bytes().to_vec()
}

/// Check that applied migrations exactly match what's on disk.
pub async fn validate_migrations(pool: &DbPool) -> Result<bool> {
    info!("validating migration integrity");

    create_migration_table(pool).await?;
    let migrations = load_migrations()?;
    let applied_versions = get_applied_migration_versions(pool).await?;
    let expected_versions: Vec<i64> =
        migrations.iter().map(|(filename, _)| extract_version_from_filename(filename)).collect::<Result<Vec<_>>>()?;

    for expected in &expected_versions {
        if !applied_versions.contains(expected) {
            warn!(version = expected, "missing migration");
            return Ok(false);
        }
    }

    for applied in &applied_versions {
        if !expected_versions.contains(applied) {
            warn!(version = applied, "unexpected migration found");
            return Ok(false);
        }
    }

    info!("migration validation successful");
    Ok(true)
}

pub async fn get_migration_version(pool: &DbPool) -> Result<i64> {
    create_migration_table(pool).await?;
    let applied = get_applied_migration_versions(pool).await?;
    Ok(applied.into_iter().max().unwrap_or(0))
}

pub async fn list_applied_migrations(pool: &DbPool) -> Result<Vec<MigrationInfo>> {
    create_migration_table(pool).await?;
    let rows = sqlx::query(
        "SELECT version, description, checksum, execution_time, installed_on FROM _tvm_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| TvmError::database(e, "failed to list applied migrations"))?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationInfo {
            version: row.get("version"),
            description: row.get("description"),
            installed_on: row.get("installed_on"),
            execution_time: row.get("execution_time"),
            checksum: row.get("checksum"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_version_from_timestamp_prefixed_filename() {
        assert_eq!(extract_version_from_filename("20260101000001_create_users_table").unwrap(), 20260101000001);
        assert!(extract_version_from_filename("invalid_filename").is_err());
    }

    #[test]
    fn checksum_is_stable_and_content_sensitive() {
        let a = calculate_checksum("CREATE TABLE test (id INTEGER);");
        let b = calculate_checksum("CREATE TABLE test (id INTEGER);");
        let c = calculate_checksum("CREATE TABLE other (id INTEGER);");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
