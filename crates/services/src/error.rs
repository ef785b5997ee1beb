//! Job and session error kinds (`spec.md` §7).
//!
//! The semantic variants themselves live on `domain::errors` since they are
//! pure data the API layer also needs to serialize; this module adds the
//! `From` glue that lets runners propagate upstream/storage/database errors
//! with `?` instead of hand-rolled `match`es at every call site.

pub use domain::errors::{JobError, MediatorError, WorkerAuthError};

impl From<external_clients::VoiceClientError> for JobError {
    fn from(e: external_clients::VoiceClientError) -> Self {
        match e {
            external_clients::VoiceClientError::Http { status: _, body } => {
                JobError::UpstreamRejected {
                    service: "voice-svc".to_string(),
                    body,
                }
            }
            external_clients::VoiceClientError::Unavailable(detail) => {
                JobError::UpstreamUnavailable {
                    service: "voice-svc".to_string(),
                    detail,
                }
            }
            external_clients::VoiceClientError::EmptyBody => JobError::VoiceSynthFailed { chunk_index: None },
            external_clients::VoiceClientError::WebSocket(detail) => JobError::UpstreamUnavailable {
                service: "voice-svc".to_string(),
                detail,
            },
        }
    }
}

impl From<external_clients::VideoClientError> for JobError {
    fn from(e: external_clients::VideoClientError) -> Self {
        match e {
            external_clients::VideoClientError::Http { status: _, body } => JobError::VideoEnqueueFailed(body),
            external_clients::VideoClientError::Unavailable(detail) => JobError::UpstreamUnavailable {
                service: "video-svc".to_string(),
                detail,
            },
            external_clients::VideoClientError::UpstreamFailed(detail) => JobError::UpstreamRejected {
                service: "video-svc".to_string(),
                body: detail,
            },
            external_clients::VideoClientError::WebSocket(detail) => JobError::UpstreamUnavailable {
                service: "video-svc".to_string(),
                detail,
            },
        }
    }
}

impl From<external_clients::ObjectStoreError> for JobError {
    fn from(e: external_clients::ObjectStoreError) -> Self {
        JobError::StorageUploadFailed(e.to_string())
    }
}

impl From<database::RepositoryError> for JobError {
    fn from(e: database::RepositoryError) -> Self {
        JobError::StoreError(e.to_string())
    }
}

impl From<external_clients::VoiceClientError> for MediatorError {
    fn from(e: external_clients::VoiceClientError) -> Self {
        MediatorError::UpstreamError {
            service: "voice-svc".to_string(),
            detail: e.to_string(),
        }
    }
}

impl From<external_clients::VideoClientError> for MediatorError {
    fn from(e: external_clients::VideoClientError) -> Self {
        MediatorError::UpstreamError {
            service: "video-svc".to_string(),
            detail: e.to_string(),
        }
    }
}

impl From<external_clients::LlmClientError> for MediatorError {
    fn from(e: external_clients::LlmClientError) -> Self {
        MediatorError::LlmError(e.to_string())
    }
}
