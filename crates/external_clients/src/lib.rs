//! Typed clients for every upstream the control plane depends on
//! (`spec.md` §4.1): voice-svc, video-svc, the LLM backend, and the object
//! store. Each upstream gets a trait plus a concrete HTTP/WS implementation,
//! mirroring the teacher's `ExternalBackend` split
//! (`crates/inference_providers/src/external/`).

pub mod errors;
pub mod llm;
pub mod object_store;
pub mod video;
pub mod voice;

pub use errors::{LlmClientError, ObjectStoreError, VideoClientError, VoiceClientError};
pub use llm::{LlmClient, LlmClientTrait, LlmTurn};
pub use object_store::{ObjectStoreTrait, S3ObjectStore};
pub use video::{VideoClient, VideoClientTrait, VideoStatusBody, VideoStatusResult};
pub use voice::{mint_token, verify_token, VoiceClient, VoiceClientTrait};
