use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Principal for machine callers (`spec.md` §3 `ApiKey`). The secret itself
/// is never stored — only `secret_hash` (salted) and `display_prefix`
/// (first few characters, for UI display) are retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub secret_hash: String,
    pub display_prefix: String,
    pub permitted_resources: Vec<String>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}
