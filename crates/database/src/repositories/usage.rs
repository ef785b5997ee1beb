use crate::error::{RepositoryError, Result};
use crate::pool::DbPool;
use domain::usage::{UsageCounter, UsageResource};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone)]
pub struct UsageRepository {
    pool: DbPool,
}

impl UsageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, owner_id: Uuid, resource: UsageResource) -> Result<Option<UsageCounter>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM usage_counters WHERE owner_id = $1 AND resource = $2",
                &[&owner_id, &resource.to_string()],
            )
            .await?;
        row.map(|r| self.row_to_counter(r)).transpose()
    }

    /// Atomically increments `used` by `amount`, relying on `ON CONFLICT` to
    /// avoid a read-modify-write race between concurrent job completions.
    pub async fn increment(
        &self,
        owner_id: Uuid,
        resource: UsageResource,
        amount: f64,
        default_limit: f64,
    ) -> Result<UsageCounter> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO usage_counters (owner_id, resource, used, "limit", billing_cycle_anchor)
                VALUES ($1, $2, $3, $4, now())
                ON CONFLICT (owner_id, resource)
                DO UPDATE SET used = usage_counters.used + $3
                RETURNING *
                "#,
                &[&owner_id, &resource.to_string(), &amount, &default_limit],
            )
            .await?;
        self.row_to_counter(row)
    }

    fn row_to_counter(&self, row: tokio_postgres::Row) -> Result<UsageCounter> {
        let resource_str: String = row.try_get("resource")?;
        let resource = UsageResource::from_str(&resource_str).map_err(|_| {
            RepositoryError::UnrecognizedEnum {
                field: "resource",
                value: resource_str,
            }
        })?;
        Ok(UsageCounter {
            owner_id: row.try_get("owner_id")?,
            resource,
            used: row.try_get("used")?,
            limit: row.try_get("limit")?,
            billing_cycle_anchor: row.try_get("billing_cycle_anchor")?,
        })
    }
}
