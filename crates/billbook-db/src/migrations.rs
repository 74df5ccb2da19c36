//! # Database Migrations
//!
//! Embedded SQL migrations, applied at startup.
//!
//! ```text
//! Database::new(config)
//!      │
//!      ▼
//! run_migrations(&pool)
//!      ├── _sqlx_migrations missing? create it
//!      ├── compare embedded vs applied (by version + checksum)
//!      └── apply pending files in order, one transaction each
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Add `migrations/sqlite/NNN_description.sql` with the next number
//! 2. Never edit an applied migration; add a new one

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations from `migrations/sqlite`, embedded at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations. Safe to call repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_all_migrations_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert!(total >= 1);
        assert_eq!(total, applied);

        // Second run is a no-op.
        run_migrations(db.pool()).await.unwrap();
    }
}
