use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level process configuration, assembled once at startup from
/// environment variables (see `spec.md` §6.3 for the recognized set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub object_store: ObjectStoreConfig,
    pub voice_service: VoiceServiceConfig,
    pub video_service: VideoServiceConfig,
    pub llm_service: LlmServiceConfig,
    pub worker_callback: WorkerCallbackConfig,
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Allowed browser origin for CORS; trailing slash is tolerated.
    pub frontend_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
    /// Use the in-memory mock backend instead of a live Postgres connection.
    pub mock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceServiceConfig {
    /// REST base URL (`COQUI_XTTS_BASE_URL`).
    pub rest_base_url: String,
    /// WebSocket URL (`VOICE_SERVICE_WS_URL`).
    pub ws_url: String,
    /// HMAC secret used to mint `VOICE_CLONE_AUTH-*` tokens (`VOICE_SERVICE_SECRET_KEY`).
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoServiceConfig {
    /// REST base URL (`VIDEO_SERVICE_URL`).
    pub rest_base_url: String,
    /// WebSocket URL (`VIDEO_SERVICE_WS_URL`).
    pub ws_url: String,
    /// Static bearer key (`VIDEO_SERVICE_API_KEY`).
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmServiceConfig {
    /// REST base URL for the conversational LLM backend (`LLM_SERVICE_URL`).
    pub rest_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerCallbackConfig {
    /// Static bearer token accepted on `/worker/callback` (`WORKER_CALLBACK_TOKEN`).
    pub token: String,
}

/// How the video pipeline learns that a render finished: either by polling
/// video-svc, or by waiting for an inbound push from the worker callback
/// endpoint. Exactly one of these is live per deployment (`spec.md` §4.8, §9).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VideoCompletionSource {
    Poll,
    Callback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// `MAX_CONCURRENT_JOBS`, default 1.
    pub max_concurrent_jobs: usize,
    /// Soft bound on queued-but-not-dispatched jobs before `submit` fails with `QueueFull`.
    pub queue_bound: usize,
    pub completion_source: VideoCompletionSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut modules = HashMap::new();
        modules.insert("api".to_string(), "debug".to_string());
        modules.insert("services".to_string(), "debug".to_string());

        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            modules,
        }
    }
}
