//! `AudioJobRunner` (`spec.md` §4.7).

use crate::audio_assembler;
use crate::avatar_cache::AvatarCache;
use crate::error::JobError;
use crate::scheduler::JobRunner;
use crate::text_chunker;
use crate::usage::UsageAccountant;
use async_trait::async_trait;
use chrono::Utc;
use database::JobRepository;
use domain::job::JobStatus;
use domain::usage::UsageResource;
use external_clients::{ObjectStoreTrait, VoiceClientTrait};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Delay between successive voice-svc synthesize calls (`spec.md` §4.7 step 3).
const INTER_CHUNK_DELAY_MS: u64 = 3000;
const CHUNK_TOKEN_CAP: usize = 200;

pub struct AudioJobRunner {
    jobs: Arc<JobRepository>,
    avatars: Arc<AvatarCache>,
    voice: Arc<dyn VoiceClientTrait>,
    object_store: Arc<dyn ObjectStoreTrait>,
    usage: Arc<UsageAccountant>,
}

impl AudioJobRunner {
    pub fn new(
        jobs: Arc<JobRepository>,
        avatars: Arc<AvatarCache>,
        voice: Arc<dyn VoiceClientTrait>,
        object_store: Arc<dyn ObjectStoreTrait>,
        usage: Arc<UsageAccountant>,
    ) -> Self {
        Self {
            jobs,
            avatars,
            voice,
            object_store,
            usage,
        }
    }

    async fn set_progress(&self, job_id: Uuid, progress: u8) {
        if let Err(e) = self
            .jobs
            .transition(job_id, JobStatus::Processing, Some(progress), None, None, None)
            .await
        {
            warn!(%job_id, error = %e, "failed to record progress");
        }
    }
}

#[async_trait]
impl JobRunner for AudioJobRunner {
    async fn run(&self, job_id: Uuid, cancel: CancellationToken) -> Result<(), JobError> {
        let job = self
            .jobs
            .get_by_id_unchecked(job_id)
            .await?
            .ok_or(JobError::StoreError("job vanished before execution".to_string()))?;

        let avatar = self.avatars.get(job.avatar_id).await?;
        self.set_progress(job_id, 10).await;

        let text = job
            .script_text
            .clone()
            .ok_or_else(|| JobError::ValidationFailed {
                field: "script_text".to_string(),
                reason: "audio job requires script text".to_string(),
            })?;

        let plan = text_chunker::plan(&text, CHUNK_TOKEN_CAP);
        self.set_progress(job_id, 20).await;

        let total_chunks = plan.len().max(1);
        let mut synthesized = Vec::with_capacity(plan.len());
        for (index, chunk) in plan.chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(JobError::ShutdownAborted);
            }

            let audio = self
                .voice
                .synthesize(&job.id.to_string(), avatar.voice_sample_url.as_deref(), &chunk.text, &job.language)
                .await
                .map_err(|e| match e {
                    external_clients::VoiceClientError::EmptyBody => {
                        JobError::VoiceSynthFailed { chunk_index: Some(index) }
                    }
                    other => JobError::from(other),
                })?;
            synthesized.push(audio);

            let progress = 20 + ((index + 1) as u8).saturating_mul(50) / total_chunks as u8;
            self.set_progress(job_id, progress.min(70)).await;

            let is_last = index + 1 == plan.len();
            if !is_last {
                tokio::time::sleep(Duration::from_millis(INTER_CHUNK_DELAY_MS)).await;
            }
        }

        let assembled = audio_assembler::concat(synthesized)?;
        self.set_progress(job_id, 80).await;

        let epoch_ms = Utc::now().timestamp_millis();
        let key = format!("generated_audio/{}/{}-{}.wav", job.owner_id, job.id, epoch_ms);
        self.object_store
            .put(&key, assembled, "audio/wav", false)
            .await
            .map_err(JobError::from)?;
        self.set_progress(job_id, 90).await;

        let word_count = text.split_whitespace().count().max(1) as f64;
        let duration_minutes = (word_count / 150.0).max(0.5);
        self.usage.commit(job.owner_id, UsageResource::AudioMinutes, duration_minutes).await;
        self.set_progress(job_id, 95).await;

        self.jobs
            .transition(
                job_id,
                JobStatus::Completed,
                Some(100),
                Some(key.clone()),
                None,
                Some(Utc::now()),
            )
            .await?;

        info!(%job_id, owner_id = %job.owner_id, "audio job completed");
        Ok(())
    }
}
