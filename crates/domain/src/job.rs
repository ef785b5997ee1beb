use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Audio,
    Video,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Audio => write!(f, "audio"),
            JobKind::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Script,
    PreRecordedAudio,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputMode::Script => write!(f, "script"),
            InputMode::PreRecordedAudio => write!(f, "pre_recorded_audio"),
        }
    }
}

impl std::str::FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "script" => Ok(InputMode::Script),
            "pre_recorded_audio" => Ok(InputMode::PreRecordedAudio),
            other => Err(format!("unknown input mode: {other}")),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(JobKind::Audio),
            "video" => Ok(JobKind::Video),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Fast,
    High,
    /// Accepted on the wire (`spec.md` §6.1 allows `standard`) and treated as `Fast`'s
    /// polling cadence/ceiling; kept distinct so it round-trips on the status endpoint.
    Standard,
}

impl Quality {
    /// `spec.md` §4.8 step 4: poll cadence in milliseconds.
    pub fn poll_interval_ms(self) -> u64 {
        match self {
            Quality::High => 5000,
            Quality::Fast | Quality::Standard => 3000,
        }
    }

    /// Maximum poll attempts before `PollTimeout` (`spec.md` §4.8 step 4).
    pub fn max_poll_attempts(self) -> u32 {
        match self {
            Quality::High => 240,
            Quality::Fast | Quality::Standard => 120,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Fast => "fast",
            Quality::High => "high",
            Quality::Standard => "standard",
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Quality::Fast),
            "high" => Ok(Quality::High),
            "standard" => Ok(Quality::Standard),
            other => Err(format!("unknown quality: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::TimedOut
        )
    }

    /// Validates a transition against the state machine in `spec.md` §4.3:
    /// `queued → processing → completed`, `queued → processing → failed`,
    /// `queued → failed`, and `processing → timed-out`. Any attempt to
    /// leave a terminal state fails.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Queued, Processing)
                | (Queued, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, TimedOut)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed_out",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "timed_out" => Ok(JobStatus::TimedOut),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// One audio or video generation request (`spec.md` §3 `GenerationJob`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub avatar_id: Uuid,
    pub kind: JobKind,
    pub input_mode: InputMode,
    pub script_text: Option<String>,
    pub source_audio_url: Option<String>,
    pub quality: Quality,
    pub language: String,
    pub upstream_task_id: Option<String>,
    pub audio_url: Option<String>,
    pub result_url: Option<String>,
    pub status: JobStatus,
    pub progress: u8,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Checks the invariants from `spec.md` §3. Used by tests and by the
    /// repository layer as a defensive assertion before persisting.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.status == JobStatus::Completed && self.result_url.is_none() {
            return Err("completed job must have a result_url".to_string());
        }
        if self.status == JobStatus::Failed && self.error_message.is_none() {
            return Err("failed job must have an error_message".to_string());
        }
        if self.kind == JobKind::Video
            && self.input_mode == InputMode::Script
            && self.script_text.is_none()
        {
            return Err("script-input video job must have script_text".to_string());
        }
        Ok(())
    }
}
