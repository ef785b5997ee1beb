use crate::error::Result;
use crate::pool::DbPool;
use chrono::Utc;
use domain::api_key::ApiKey;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

pub struct ApiKeyRepository {
    pool: DbPool,
}

impl ApiKeyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn hash_secret(secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn display_prefix(secret: &str) -> String {
        let prefix_len = 10.min(secret.len());
        secret[..prefix_len].to_string()
    }

    /// Looks the key up by its hash — never by the plaintext secret, which
    /// is never persisted.
    pub async fn get_by_secret(&self, secret: &str) -> Result<Option<ApiKey>> {
        let hash = Self::hash_secret(secret);
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM api_keys WHERE secret_hash = $1", &[&hash])
            .await?;
        row.map(|r| self.row_to_key(r)).transpose()
    }

    pub async fn touch_last_used(&self, id: Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE api_keys SET last_used_at = $2 WHERE id = $1",
                &[&id, &Utc::now()],
            )
            .await?;
        Ok(())
    }

    fn row_to_key(&self, row: tokio_postgres::Row) -> Result<ApiKey> {
        Ok(ApiKey {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            secret_hash: row.try_get("secret_hash")?,
            display_prefix: row.try_get("display_prefix")?,
            permitted_resources: row.try_get("permitted_resources")?,
            active: row.try_get("active")?,
            expires_at: row.try_get("expires_at")?,
            last_used_at: row.try_get("last_used_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefix_truncates_to_ten_chars() {
        assert_eq!(ApiKeyRepository::display_prefix("sk_abc1234567890"), "sk_abc1234");
    }

    #[test]
    fn display_prefix_handles_short_secrets() {
        assert_eq!(ApiKeyRepository::display_prefix("ab"), "ab");
    }

    #[test]
    fn hash_secret_is_deterministic() {
        assert_eq!(
            ApiKeyRepository::hash_secret("topsecret"),
            ApiKeyRepository::hash_secret("topsecret")
        );
    }
}
