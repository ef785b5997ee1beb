//! PostgreSQL persistence for the avatar control-plane backend.
//!
//! A single `Database` struct owns the connection pool and hands out one
//! repository per aggregate (`spec.md` §3). Unlike the teacher's Patroni
//! cluster layer, this backend talks to a single primary — the spec's
//! Non-goals exclude multi-node failover.

pub mod error;
pub mod migrations;
pub mod mock;
pub mod pool;
pub mod repositories;

pub use error::{RepositoryError, Result};
pub use mock::create_mock_database;
pub use pool::DbPool;
pub use repositories::{ApiKeyRepository, AvatarRepository, JobRepository, SessionRepository, UsageRepository};

use tracing::info;

/// Owns the pool and one repository per aggregate.
pub struct Database {
    pub jobs: JobRepository,
    pub usage: UsageRepository,
    pub avatars: AvatarRepository,
    pub sessions: SessionRepository,
    pub api_keys: ApiKeyRepository,
    pool: DbPool,
}

impl Database {
    pub fn new(pool: DbPool) -> Self {
        Self {
            jobs: JobRepository::new(pool.clone()),
            usage: UsageRepository::new(pool.clone()),
            avatars: AvatarRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            api_keys: ApiKeyRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connects, runs migrations, and returns a ready-to-use `Database`.
    /// If `cfg.mock` is set, returns a mock database instead (test harness
    /// convenience, same flag the teacher's config carries).
    pub async fn from_config(cfg: &config::DatabaseConfig) -> anyhow::Result<Self> {
        if cfg.mock {
            info!("using mock database");
            return mock::create_mock_database().await;
        }

        let pool = pool::create_pool(cfg).await?;
        migrations::run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
