//! Shared application state threaded through every route via axum's
//! `State` extractor (`spec.md` §9: explicitly constructed services passed
//! to handlers, no process-global singletons other than configuration).

use config::ApiConfig;
use database::Database;
use external_clients::{LlmClientTrait, ObjectStoreTrait, VideoClientTrait, VoiceClientTrait};
use services::{AvatarCache, JobScheduler, UsageAccountant};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<ApiConfig>,
    pub scheduler: Arc<JobScheduler>,
    pub usage: Arc<UsageAccountant>,
    pub avatars: Arc<AvatarCache>,
    pub object_store: Arc<dyn ObjectStoreTrait>,
    pub voice: Arc<dyn VoiceClientTrait>,
    pub video: Arc<dyn VideoClientTrait>,
    pub llm: Arc<dyn LlmClientTrait>,
    /// Cancelled on graceful shutdown; every live session mediator derives a
    /// child token from this one so a process shutdown tears sessions down
    /// alongside in-flight jobs (`spec.md` §5).
    pub shutdown: CancellationToken,
}
