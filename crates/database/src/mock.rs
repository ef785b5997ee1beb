use crate::Database;
use anyhow::Result;
use std::env;

/// Build a `Database` for tests. If `TEST_DATABASE_URL` is set, connects to
/// a real local postgres; otherwise returns a pool pointed at a host that
/// does not exist, with a 1ms connect timeout, so unit tests that never
/// touch the database can construct a `Database` without I/O.
pub async fn create_mock_database() -> Result<Database> {
    if let Ok(database_url) = env::var("TEST_DATABASE_URL") {
        let pg_config: tokio_postgres::Config = database_url.parse()?;
        let mgr_config = deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        };
        let mgr = deadpool_postgres::Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
        let pool = deadpool_postgres::Pool::builder(mgr).max_size(4).build()?;
        return Ok(Database::new(pool));
    }

    let mut pg_config = tokio_postgres::Config::new();
    pg_config
        .host("mock-host-that-does-not-exist")
        .port(5432)
        .dbname("mock_db")
        .user("mock_user")
        .password("mock_pass")
        .connect_timeout(std::time::Duration::from_millis(1));

    let mgr_config = deadpool_postgres::ManagerConfig {
        recycling_method: deadpool_postgres::RecyclingMethod::Fast,
    };
    let mgr = deadpool_postgres::Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
    let pool = deadpool_postgres::Pool::builder(mgr).max_size(1).build()?;

    Ok(Database::new(pool))
}
