//! In-process test database for in-library tests (`#[cfg(test)]` only).
//!
//! Takes the *shape* of the teacher's `storage::test_helpers::TestDatabase`
//! (spin up a fresh, isolated database and run migrations against it) but
//! not its Postgres-testcontainers backend: TVM's only storage backend is
//! SQLite, so this spins up a `sqlite::memory:` pool via the same
//! `storage::pool::create_pool` every production binary uses, which already
//! has a SQLite branch.

use crate::config::DatabaseConfig;
use crate::storage::{create_pool, DbPool};

/// An isolated, migrated, in-memory SQLite database for a single test.
pub struct TestDatabase {
    pub pool: DbPool,
}

impl TestDatabase {
    /// Each call gets its own in-memory database — `sqlite::memory:` pools
    /// are never shared across `TestDatabase` instances because `sqlx`
    /// opens a fresh connection per pool, and SQLite's `:memory:` database
    /// is private to the connection that created it.
    pub async fn new() -> Self {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            auto_migrate: true,
            ..Default::default()
        };

        let pool = create_pool(&config).await.expect("failed to create in-memory test database");

        Self { pool }
    }
}
