use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity an end-user speaks as (`spec.md` §3).
///
/// Mutations flow through the excluded CRUD layer; the core only reads
/// avatars by id through a read-through cache (`services::avatar_cache`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Avatar {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub display_name: String,
    pub image_url: Option<String>,
    pub voice_sample_url: Option<String>,
    pub persona_prompt: String,
    pub language: String,
    pub is_public: bool,
}

impl Avatar {
    /// `spec.md` §4.8 step 1: video jobs with a script input require both
    /// an image and a voice sample to be present on the avatar.
    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }

    pub fn has_voice_sample(&self) -> bool {
        self.voice_sample_url.is_some()
    }
}
