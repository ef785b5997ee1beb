//! Request/response DTOs for the HTTP surface (`spec.md` §6.1).

use chrono::{DateTime, Utc};
use domain::job::{InputMode, JobStatus, Quality};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
}

impl ErrorResponse {
    pub fn simple(kind: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: kind.to_string(),
                used: None,
                limit: None,
                remaining: None,
            },
        }
    }

    pub fn quota_exceeded(used: f64, limit: f64, remaining: f64) -> Self {
        Self {
            error: ErrorDetail {
                message: format!("quota exceeded: used {used}, limit {limit}"),
                r#type: "quota_exceeded".to_string(),
                used: Some(used),
                limit: Some(limit),
                remaining: Some(remaining),
            },
        }
    }
}

/// `inputType` on the wire; maps to `domain::job::InputMode` (`spec.md` §6.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WireInputType {
    Script,
    Audio,
}

impl From<WireInputType> for InputMode {
    fn from(w: WireInputType) -> Self {
        match w {
            WireInputType::Script => InputMode::Script,
            WireInputType::Audio => InputMode::PreRecordedAudio,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateVideoRequest {
    pub text: Option<String>,
    #[serde(rename = "avatarId")]
    pub avatar_id: Uuid,
    pub quality: Quality,
    #[serde(rename = "audioUrl")]
    pub audio_url: Option<String>,
    #[serde(rename = "inputType")]
    pub input_type: WireInputType,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateAudioRequest {
    pub text: String,
    #[serde(rename = "voiceId")]
    pub voice_id: Uuid,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerateResponse {
    #[serde(rename = "taskId")]
    pub task_id: Uuid,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerationStatusResponse {
    #[serde(rename = "taskId")]
    pub task_id: Uuid,
    pub status: String,
    pub progress: u8,
    pub video_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `spec.md` §6.1: progress is derived from status when the row doesn't
/// carry one explicitly (never happens for us since the row always has a
/// progress column, but the derivation is kept as the documented fallback).
pub fn derive_progress(status: JobStatus, stored_progress: u8) -> u8 {
    if stored_progress != 0 {
        return stored_progress;
    }
    match status {
        JobStatus::Queued => 10,
        JobStatus::Processing => 50,
        JobStatus::Completed => 100,
        JobStatus::Failed | JobStatus::TimedOut => 0,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: HealthServices,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthServices {
    pub voice_service: &'static str,
    pub video_service: &'static str,
    pub database: &'static str,
}
