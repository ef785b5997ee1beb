use crate::error::Result;
use crate::pool::DbPool;
use domain::avatar::Avatar;
use uuid::Uuid;

/// Read path for avatars. Creation/update of avatars is CRUD owned by a
/// separate surface (`spec.md` §1 Non-goals) — this repository only serves
/// the lookups `services::avatar_cache` needs on a cache miss.
#[derive(Clone)]
pub struct AvatarRepository {
    pool: DbPool,
}

impl AvatarRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Avatar>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM avatars WHERE id = $1", &[&id])
            .await?;
        row.map(|r| self.row_to_avatar(r)).transpose()
    }

    fn row_to_avatar(&self, row: tokio_postgres::Row) -> Result<Avatar> {
        Ok(Avatar {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            display_name: row.try_get("display_name")?,
            image_url: row.try_get("image_url")?,
            voice_sample_url: row.try_get("voice_sample_url")?,
            persona_prompt: row.try_get("persona_prompt")?,
            language: row.try_get("language")?,
            is_public: row.try_get("is_public")?,
        })
    }
}
