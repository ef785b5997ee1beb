//! Avatar-by-id cache (`spec.md` §5): read-through, unbounded, never
//! invalidated during process lifetime — avatars are treated as CRUD owned
//! by an excluded surface (`spec.md` §1 Non-goals), so nothing here ever
//! writes back to Postgres.
//!
//! Grounded on the teacher's moka cache construction in
//! `crates/api/src/middleware/cache.rs`.

use crate::error::JobError;
use database::AvatarRepository;
use domain::avatar::Avatar;
use moka::future::Cache;
use std::sync::Arc;
use uuid::Uuid;

pub struct AvatarCache {
    cache: Cache<Uuid, Arc<Avatar>>,
    avatars: Arc<AvatarRepository>,
}

impl AvatarCache {
    pub fn new(avatars: Arc<AvatarRepository>) -> Self {
        Self {
            cache: Cache::builder().build(),
            avatars,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Avatar>, JobError> {
        if let Some(hit) = self.cache.get(&id).await {
            return Ok(hit);
        }

        let avatar = self
            .avatars
            .get_by_id(id)
            .await
            .map_err(JobError::from)?
            .ok_or(JobError::AvatarNotFound)?;

        let avatar = Arc::new(avatar);
        self.cache.insert(id, avatar.clone()).await;
        Ok(avatar)
    }
}
