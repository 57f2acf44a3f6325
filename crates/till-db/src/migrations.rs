//! # Schema Migrations
//!
//! `migrations/sqlite/*.sql` is compiled into the binary and applied by
//! [`Database::new`](crate::Database::new) unless `DbConfig::run_migrations`
//! is off. sqlx records each applied file in `_sqlx_migrations` and refuses
//! to start against a database whose recorded checksum differs, so a file
//! that has shipped is never edited: schema changes go in a new
//! `NNN_description.sql`.
//!
//! | file                     | creates                                   |
//! |--------------------------|-------------------------------------------|
//! | `001_initial_schema.sql` | `products`, `sales`, `sale_items`, indexes |

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration the database has not recorded yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying schema migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema is up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts. An unmigrated database has no
/// `_sqlx_migrations` table and reports zero applied; any other failure is
/// returned.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master \
         WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if has_table {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    } else {
        0
    };

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
