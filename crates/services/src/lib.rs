//! Business logic for the avatar control-plane backend (`spec.md` §4): job
//! scheduling and execution, usage accounting, text chunking, audio
//! assembly, and realtime session mediation. Depends on `database` and
//! `external_clients` for I/O, and on `domain` for the shared data model;
//! has no knowledge of HTTP or WebSocket transport, which lives in `api`.

pub mod audio_assembler;
pub mod audio_job_runner;
pub mod avatar_cache;
pub mod error;
pub mod job_dispatcher;
pub mod quota_gate;
pub mod reaper;
pub mod scheduler;
pub mod session_mediator;
pub mod text_chunker;
pub mod usage;
pub mod video_job_runner;

pub use audio_job_runner::AudioJobRunner;
pub use avatar_cache::AvatarCache;
pub use error::{JobError, MediatorError, WorkerAuthError};
pub use job_dispatcher::JobDispatcher;
pub use quota_gate::QuotaGate;
pub use reaper::Reaper;
pub use scheduler::{JobRunner, JobScheduler};
pub use session_mediator::{ClientFrame, ClientInbound, SessionMediator, SessionMediatorDeps};
pub use usage::{UsageAccountant, UsageCheckResult};
pub use video_job_runner::VideoJobRunner;
