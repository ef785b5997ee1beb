use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ObjectStoreError {
    #[error("object already exists at key {0}")]
    AlreadyExists(String),

    #[error("object not found at key {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error, Clone)]
pub enum VoiceClientError {
    #[error("voice-svc HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("voice-svc unavailable: {0}")]
    Unavailable(String),

    #[error("voice-svc returned an empty audio body")]
    EmptyBody,

    #[error("voice-svc websocket error: {0}")]
    WebSocket(String),
}

#[derive(Debug, Error, Clone)]
pub enum VideoClientError {
    #[error("video-svc HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("video-svc unavailable: {0}")]
    Unavailable(String),

    #[error("video-svc reported failure: {0}")]
    UpstreamFailed(String),

    #[error("video-svc websocket error: {0}")]
    WebSocket(String),
}

#[derive(Debug, Error, Clone)]
pub enum LlmClientError {
    #[error("llm HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("llm unavailable: {0}")]
    Unavailable(String),
}
