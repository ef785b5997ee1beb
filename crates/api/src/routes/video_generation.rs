//! `POST /api/video-generation/generate`, `GET .../status/:taskId`,
//! `DELETE /api/video-generation/:id` (`spec.md` §6.1).

use crate::error_mapping::{job_error_response, store_error_response, validation_error, ApiError};
use crate::middleware::AuthenticatedUser;
use crate::models::{derive_progress, GenerateResponse, GenerateVideoRequest, GenerationStatusResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use domain::job::{GenerationJob, JobKind, JobStatus};
use domain::usage::UsageResource;
use services::QuotaGate;
use tracing::warn;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/video-generation/generate",
    request_body = GenerateVideoRequest,
    responses((status = 200, description = "Job queued", body = GenerateResponse)),
    tag = "VideoGeneration"
)]
pub async fn generate(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Json(req): Json<GenerateVideoRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let input_mode = req.input_type.into();

    match input_mode {
        domain::job::InputMode::Script => {
            if req.text.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(validation_error("text", "required when inputType is script"));
            }
        }
        domain::job::InputMode::PreRecordedAudio => {
            if req.audio_url.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(validation_error("audioUrl", "required when inputType is audio"));
            }
        }
    }

    // 404 if the avatar doesn't exist (`spec.md` §6.1); existence is all we
    // check here, completeness (image/voice sample) is checked when the job
    // actually runs (`spec.md` §4.8 step 1).
    state.avatars.get(req.avatar_id).await.map_err(job_error_response)?;

    let text_len = req.text.as_deref().unwrap_or("").len() as f64;
    let estimated_minutes = (text_len * 0.01).max(0.5);

    QuotaGate::new(&state.usage)
        .admit(owner_id, UsageResource::VideoMinutes, estimated_minutes)
        .await
        .map_err(job_error_response)?;

    let job = GenerationJob {
        id: Uuid::new_v4(),
        owner_id,
        avatar_id: req.avatar_id,
        kind: JobKind::Video,
        input_mode,
        script_text: req.text,
        source_audio_url: req.audio_url,
        quality: req.quality,
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
    path = "/api/video-generation/status/{taskId}",
    responses((status = 200, description = "Job status", body = GenerationStatusResponse)),
    tag = "VideoGeneration"
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
    path = "/api/video-generation/{id}",
    responses((status = 204, description = "Deleted")),
    tag = "VideoGeneration"
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
