//! Dispatches one `JobRunner` per `GenerationJob.kind` (`spec.md` §4.6).
//!
//! `JobScheduler` is generic over a single `Arc<dyn JobRunner>`, and
//! `spec.md` §5 makes `W` the one global backpressure knob shared by both
//! audio and video jobs — so one scheduler instance serves both kinds, and
//! this is the runner it holds, looking the job's kind up and delegating.

use crate::audio_job_runner::AudioJobRunner;
use crate::error::JobError;
use crate::scheduler::JobRunner;
use crate::video_job_runner::VideoJobRunner;
use async_trait::async_trait;
use database::JobRepository;
use domain::job::JobKind;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct JobDispatcher {
    jobs: Arc<JobRepository>,
    audio: Arc<AudioJobRunner>,
    video: Arc<VideoJobRunner>,
}

impl JobDispatcher {
    pub fn new(jobs: Arc<JobRepository>, audio: Arc<AudioJobRunner>, video: Arc<VideoJobRunner>) -> Self {
        Self { jobs, audio, video }
    }
}

#[async_trait]
impl JobRunner for JobDispatcher {
    async fn run(&self, job_id: Uuid, cancel: CancellationToken) -> Result<(), JobError> {
        let job = self
            .jobs
            .get_by_id_unchecked(job_id)
            .await?
            .ok_or(JobError::StoreError("job vanished before dispatch".to_string()))?;

        match job.kind {
            JobKind::Audio => self.audio.run(job_id, cancel).await,
            JobKind::Video => self.video.run(job_id, cancel).await,
        }
    }
}
