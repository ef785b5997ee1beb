//! `POST /api/audio-generation/generate`, `GET .../status/:taskId`,
//! `DELETE /api/audio-generation/:id` (`spec.md` §6.1).

use crate::error_mapping::{job_error_response, store_error_response, validation_error, ApiError};
use crate::middleware::AuthenticatedUser;
use crate::models::{derive_progress, GenerateAudioRequest, GenerateResponse, GenerationStatusResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use domain::job::{GenerationJob, InputMode, JobKind, JobStatus, Quality};
use domain::usage::UsageResource;
use services::QuotaGate;
use tracing::warn;
use uuid::Uuid;

const MAX_TEXT_CHARS: usize = 1000;

#[utoipa::path(
    post,
    path = "/api/audio-generation/generate",
    request_body = GenerateAudioRequest,
    responses((status = 200, description = "Job queued", body = GenerateResponse)),
    tag = "AudioGeneration"
)]
pub async fn generate(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Json(req): Json<GenerateAudioRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if req.text.chars().count() > MAX_TEXT_CHARS {
        return Err(validation_error("text", "must be at most 1000 characters"));
    }
    if req.text.trim().is_empty() {
        return Err(validation_error("text", "must not be empty"));
    }

    let word_count = req.text.split_whitespace().count().max(1) as f64;
    let estimated_minutes = (word_count / 150.0).max(0.5);

    QuotaGate::new(&state.usage)
        .admit(owner_id, UsageResource::AudioMinutes, estimated_minutes)
        .await
        .map_err(job_error_response)?;

    let job = GenerationJob {
        id: Uuid::new_v4(),
        owner_id,
        avatar_id: req.voice_id,
        kind: JobKind::Audio,
        input_mode: InputMode::Script,
        script_text: Some(req.text),
        source_audio_url: None,
        quality: Quality::Standard,
        language: req.language,
        upstream_task_id: None,
        audio_url: None,
        result_url: None,
        status: JobStatus::Queued,
        progress: 0,
        error_message: None,
        created_at: Utc::now(),
        completed_at: None,
    };

    let created = state.db.jobs.create(&job).await.map_err(store_error_response)?;
    state.scheduler.submit(created.id).map_err(job_error_response)?;

    Ok(Json(GenerateResponse { task_id: created.id, status: "queued" }))
}

#[utoipa::path(
    get,
    path = "/api/audio-generation/status/{taskId}",
    responses((status = 200, description = "Job status", body = GenerationStatusResponse)),
    tag = "AudioGeneration"
)]
pub async fn status(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<GenerationStatusResponse>, ApiError> {
    let job = state
        .db
        .jobs
        .get_by_id(task_id, owner_id)
        .await
        .map_err(store_error_response)?
        .ok_or((StatusCode::NOT_FOUND, Json(crate::models::ErrorResponse::simple("not_found", "job not found"))))?;

    Ok(Json(GenerationStatusResponse {
        task_id: job.id,
        status: job.status.to_string(),
        progress: derive_progress(job.status, job.progress),
        video_url: job.result_url,
        error_message: job.error_message,
        created_at: job.created_at,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/audio-generation/{id}",
    responses((status = 204, description = "Deleted")),
    tag = "AudioGeneration"
)]
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let job = state.db.jobs.get_by_id(id, owner_id).await.map_err(store_error_response)?;

    if let Some(job) = &job {
        if let Some(key) = &job.result_url {
            if let Err(e) = state.object_store.delete(key).await {
                warn!(job_id = %id, key, error = %e, "failed to delete blob, proceeding with row deletion");
            }
        }
    }

    // Idempotent: delete-then-read yields not found, but a repeated delete is
    // a no-op success rather than a 404 (`spec.md` §8).
    state.db.jobs.delete(id, owner_id).await.map_err(store_error_response)?;

    Ok(StatusCode::NO_CONTENT)
}
