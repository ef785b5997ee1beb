//! `VideoJobRunner` (`spec.md` §4.8).

use crate::avatar_cache::AvatarCache;
use crate::error::JobError;
use crate::scheduler::JobRunner;
use crate::usage::UsageAccountant;
use async_trait::async_trait;
use chrono::Utc;
use config::VideoCompletionSource;
use database::JobRepository;
use domain::job::{InputMode, JobStatus};
use domain::usage::UsageResource;
use external_clients::{ObjectStoreTrait, VideoClientTrait, VideoStatusResult, VoiceClientTrait};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

pub struct VideoJobRunner {
    jobs: Arc<JobRepository>,
    avatars: Arc<AvatarCache>,
    voice: Arc<dyn VoiceClientTrait>,
    video: Arc<dyn VideoClientTrait>,
    object_store: Arc<dyn ObjectStoreTrait>,
    usage: Arc<UsageAccountant>,
    completion_source: VideoCompletionSource,
}

impl VideoJobRunner {
    pub fn new(
        jobs: Arc<JobRepository>,
        avatars: Arc<AvatarCache>,
        voice: Arc<dyn VoiceClientTrait>,
        video: Arc<dyn VideoClientTrait>,
        object_store: Arc<dyn ObjectStoreTrait>,
        usage: Arc<UsageAccountant>,
        completion_source: VideoCompletionSource,
    ) -> Self {
        Self {
            jobs,
            avatars,
            voice,
            video,
            object_store,
            usage,
            completion_source,
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

    /// Runs the bounded polling loop (`spec.md` §4.8 step 4A). Returns the
    /// finished mp4 bytes once video-svc reports readiness.
    async fn poll_until_ready(
        &self,
        task_id: &str,
        quality: domain::job::Quality,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, JobError> {
        let interval = Duration::from_millis(quality.poll_interval_ms());
        let max_attempts = quality.max_poll_attempts();

        for attempt in 0..max_attempts {
            if cancel.is_cancelled() {
                return Err(JobError::ShutdownAborted);
            }

            match self.video.status(task_id).await {
                // An empty body alongside a `video/mp4` content-type is transient
                // (`spec.md` §8), not a completed render — keep polling.
                Ok(VideoStatusResult::Ready(bytes)) if bytes.is_empty() => {}
                Ok(VideoStatusResult::Ready(bytes)) => return Ok(bytes),
                Ok(VideoStatusResult::Pending(body)) => {
                    if body.status == "failed" {
                        return Err(JobError::UpstreamRejected {
                            service: "video-svc".to_string(),
                            body: body.error.unwrap_or_else(|| "video-svc reported failure".to_string()),
                        });
                    }
                    // any other status (queued, processing, …) keeps polling
                }
                Err(e) => {
                    // transient; only the last attempt records a persistent failure
                    if attempt + 1 == max_attempts {
                        return Err(JobError::from(e));
                    }
                }
            }

            tokio::time::sleep(interval).await;
        }

        Err(JobError::PollTimeout { attempts: max_attempts })
    }
}

#[async_trait]
impl JobRunner for VideoJobRunner {
    async fn run(&self, job_id: Uuid, cancel: CancellationToken) -> Result<(), JobError> {
        let job = self
            .jobs
            .get_by_id_unchecked(job_id)
            .await?
            .ok_or(JobError::StoreError("job vanished before execution".to_string()))?;

        let avatar = self.avatars.get(job.avatar_id).await?;
        if !avatar.has_image() {
            return Err(JobError::AvatarIncomplete { missing: "image".to_string() });
        }
        if job.input_mode == InputMode::Script && !avatar.has_voice_sample() {
            return Err(JobError::AvatarIncomplete { missing: "voice".to_string() });
        }
        self.set_progress(job_id, 10).await;

        let mut temp_audio_key: Option<String> = None;
        let run_result = self.run_inner(&job, &avatar, &cancel, &mut temp_audio_key).await;

        if let Some(key) = temp_audio_key {
            if let Err(e) = self.object_store.delete(&key).await {
                warn!(%job_id, key, error = %e, "failed to clean up temp audio blob");
            }
        }

        run_result
    }
}

impl VideoJobRunner {
    async fn run_inner(
        &self,
        job: &domain::job::GenerationJob,
        avatar: &domain::avatar::Avatar,
        cancel: &CancellationToken,
        temp_audio_key: &mut Option<String>,
    ) -> Result<(), JobError> {
        let job_id = job.id;

        let audio_url = match job.input_mode {
            InputMode::Script => {
                let text = job.script_text.clone().ok_or_else(|| JobError::ValidationFailed {
                    field: "script_text".to_string(),
                    reason: "video job with script input requires script text".to_string(),
                })?;
                let audio = self
                    .voice
                    .synthesize(&job_id.to_string(), avatar.voice_sample_url.as_deref(), &text, &job.language)
                    .await
                    .map_err(JobError::from)?;

                let epoch_ms = Utc::now().timestamp_millis();
                let key = format!("temp_audio/{}/{}-{}.wav", job.owner_id, job_id, epoch_ms);
                self.object_store.put(&key, audio, "audio/wav", false).await.map_err(JobError::from)?;
                *temp_audio_key = Some(key.clone());
                self.jobs
                    .transition(job_id, JobStatus::Processing, Some(50), None, None, None)
                    .await?;
                key
            }
            InputMode::PreRecordedAudio => job
                .source_audio_url
                .clone()
                .ok_or_else(|| JobError::ValidationFailed {
                    field: "source_audio_url".to_string(),
                    reason: "pre-recorded-audio job requires a source audio url".to_string(),
                })?,
        };

        let image_url = avatar.image_url.clone().ok_or(JobError::AvatarIncomplete { missing: "image".to_string() })?;
        let task_id = self
            .video
            .enqueue(&image_url, &audio_url, job.quality.as_str())
            .await
            .map_err(JobError::from)?;
        self.jobs.set_upstream_task_id(job_id, &task_id).await?;
        self.jobs
            .transition(job_id, JobStatus::Processing, Some(70), None, None, None)
            .await?;

        match self.completion_source {
            VideoCompletionSource::Poll => {
                let bytes = self.poll_until_ready(&task_id, job.quality, cancel).await?;

                let epoch_ms = Utc::now().timestamp_millis();
                let key = format!("generated_videos/{}/{}-{}.mp4", job_id, job.quality.as_str(), epoch_ms);
                self.object_store.put(&key, bytes, "video/mp4", false).await.map_err(JobError::from)?;

                let text_len = job.script_text.as_deref().unwrap_or("").len() as f64;
                let estimated_duration = (text_len * 0.01).max(0.5);
                self.usage.commit(job.owner_id, UsageResource::VideoMinutes, estimated_duration).await;

                self.jobs
                    .transition(job_id, JobStatus::Completed, Some(100), Some(key), None, Some(Utc::now()))
                    .await?;
                info!(%job_id, "video job completed via poll");
                Ok(())
            }
            VideoCompletionSource::Callback => {
                info!(%job_id, "video job enqueued; awaiting worker callback");
                Ok(())
            }
        }
    }
}
