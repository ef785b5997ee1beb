use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

/// Connection pool type alias, re-exported so callers don't depend on
/// `deadpool_postgres` directly.
pub type DbPool = Pool;

/// Build a connection pool from configuration and verify it with `SELECT 1`.
pub async fn create_pool(cfg: &config::DatabaseConfig) -> anyhow::Result<DbPool> {
    let mut pool_cfg = Config::new();
    pool_cfg.host = Some(cfg.host.clone());
    pool_cfg.port = Some(cfg.port);
    pool_cfg.dbname = Some(cfg.database.clone());
    pool_cfg.user = Some(cfg.username.clone());
    pool_cfg.password = Some(cfg.password.clone());
    pool_cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    pool_cfg.pool = Some(deadpool_postgres::PoolConfig::new(cfg.max_connections as usize));

    let pool = pool_cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| anyhow::anyhow!("failed to create database pool: {e}"))?;

    info!(
        host = %cfg.host,
        port = cfg.port,
        database = %cfg.database,
        "database connection pool created"
    );

    let client = pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("failed to get connection from pool: {e}"))?;
    client
        .simple_query("SELECT 1")
        .await
        .map_err(|e| anyhow::anyhow!("database connectivity check failed: {e}"))?;
    info!("database connectivity check passed");

    Ok(pool)
}
