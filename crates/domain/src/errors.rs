use thiserror::Error;

/// Semantic error kinds for job execution (`spec.md` §7). Mirrors the
/// teacher's per-subsystem error enum convention (`CompletionError`,
/// `AudioServiceError`) — one enum per failure surface rather than one
/// type per call site.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobError {
    #[error("validation failed: {field}: {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error("avatar not found")]
    AvatarNotFound,

    #[error("avatar incomplete: missing {missing}")]
    AvatarIncomplete { missing: String },

    #[error("quota exceeded for {resource}: used {used}, limit {limit}")]
    QuotaExceeded {
        resource: String,
        used: f64,
        limit: f64,
    },

    #[error("upstream {service} unavailable: {detail}")]
    UpstreamUnavailable { service: String, detail: String },

    #[error("upstream {service} rejected request: {body}")]
    UpstreamRejected { service: String, body: String },

    #[error("voice synthesis failed{}", chunk_index.map(|i| format!(" at chunk {i}")).unwrap_or_default())]
    VoiceSynthFailed { chunk_index: Option<usize> },

    #[error("video enqueue failed: {0}")]
    VideoEnqueueFailed(String),

    #[error("poll timed out after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    #[error("failed to assemble audio: {0}")]
    AssembleFailed(String),

    #[error("failed to upload to storage: {0}")]
    StorageUploadFailed(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("job was aborted by shutdown")]
    ShutdownAborted,

    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// The human-readable message persisted on `GenerationJob.error_message`.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Errors local to one session mediation (`spec.md` §4.9, §7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MediatorError {
    #[error("readiness timeout")]
    ReadinessTimeout,

    #[error("upstream {service} closed unexpectedly")]
    UpstreamClosed { service: String },

    #[error("upstream {service} error: {detail}")]
    UpstreamError { service: String, detail: String },

    #[error("llm error: {0}")]
    LlmError(String),

    #[error("invalid client message: {0}")]
    InvalidClientMessage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerAuthError {
    #[error("worker callback authentication failed")]
    Unauthorized,
}
