use crate::pool::DbPool;
use anyhow::{Context, Result};
use refinery::embed_migrations;
use tracing::info;

embed_migrations!("src/migrations/sql");

/// Runs all pending schema migrations against the pool.
pub async fn run(pool: &DbPool) -> Result<()> {
    let mut client = pool
        .get()
        .await
        .context("failed to get database connection for migrations")?;

    let report = migrations::runner()
        .run_async(&mut **client)
        .await
        .context("failed to run migrations")?;

    for migration in report.applied_migrations() {
        info!(migration = %migration.name(), "applied migration");
    }

    Ok(())
}
