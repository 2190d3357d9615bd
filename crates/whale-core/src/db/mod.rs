//! Database access layer for PostgreSQL.

pub mod backfill;
pub mod checkpoints;
pub mod copier;
pub mod cursor;
pub mod events;
pub mod holdings;
pub mod metrics;
pub mod trades;
pub mod whales;

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::path::Path;

/// Create a PostgreSQL connection pool shared by every subsystem
/// (collectors, scheduler, backfill orchestrator, API handlers).
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    Ok(pool)
}

/// Run database migrations from the workspace-root `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrator = sqlx::migrate::Migrator::new(Path::new("./migrations")).await?;
    migrator.run(pool).await?;
    Ok(())
}
