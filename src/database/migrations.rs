//! # Schema Migrations
//!
//! The schema lives in `migrations/` as `YYYYMMDDHHMMSS_description.sql` files embedded at
//! compile time. The same [`MIGRATOR`] drives server start-up and `#[sqlx::test]`.

use sqlx::PgPool;
use tracing::info;

use crate::error::{Result, TodoError};

/// Use this in tests with: `#[sqlx::test(migrator = "todo_core::database::MIGRATOR")]`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply every pending migration; already-applied ones are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| TodoError::storage("database.migrate", e))?;

    info!(migrations = MIGRATOR.iter().count(), "Database migrations applied");
    Ok(())
}
