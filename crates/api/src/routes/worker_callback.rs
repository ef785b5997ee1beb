//! `POST /worker/callback` (`spec.md` §4.10): the inbound push from the
//! video worker that, in `VideoCompletionSource::Callback` deployments,
//! drives a video job from `processing` to its terminal state.

use crate::middleware::worker_auth::verify_worker_token;
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use domain::job::JobStatus;
use domain::usage::UsageResource;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

/// `spec.md` §4.10: file parts over this size are rejected.
const MAX_FILE_BYTES: usize = 300 * 1024 * 1024;

#[derive(Debug, Serialize, ToSchema)]
pub struct CallbackResponse {
    pub ok: bool,
}

#[utoipa::path(
    post,
    path = "/worker/callback",
    responses(
        (status = 200, description = "Callback processed", body = CallbackResponse),
        (status = 401, description = "Worker authentication failed"),
    ),
    tag = "Worker"
)]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<CallbackResponse>, StatusCode> {
    verify_worker_token(&headers, &state.config.worker_callback.token)?;

    let mut task_id: Option<String> = None;
    let mut status: Option<String> = None;
    let mut error: Option<String> = None;
    let mut file: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        match field.name() {
            Some("task_id") => {
                task_id = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?);
            }
            Some("status") => {
                status = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?);
            }
            Some("error") => {
                error = Some(field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?);
            }
            Some("file") => {
                let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                if bytes.len() > MAX_FILE_BYTES {
                    return Err(StatusCode::PAYLOAD_TOO_LARGE);
                }
                file = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let task_id = task_id.ok_or(StatusCode::BAD_REQUEST)?;
    let status = status.ok_or(StatusCode::BAD_REQUEST)?;

    let job = state
        .db
        .jobs
        .get_by_upstream_task_id(&task_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // Idempotent with respect to repeated deliveries once terminal
    // (`spec.md` §4.10, §8): further deliveries succeed without mutation.
    if job.status.is_terminal() {
        return Ok(Json(CallbackResponse { ok: true }));
    }

    match status.as_str() {
        "processing" => {
            state
                .db
                .jobs
                .transition(job.id, JobStatus::Processing, Some(70), None, None, None)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }
        "failed" => {
            let message = error.unwrap_or_else(|| "worker reported failure".to_string());
            state
                .db
                .jobs
                .transition(job.id, JobStatus::Failed, Some(0), None, Some(message), Some(Utc::now()))
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }
        "completed" => {
            let Some(bytes) = file else {
                return Err(StatusCode::BAD_REQUEST);
            };

            let epoch_ms = Utc::now().timestamp_millis();
            let key = format!("generated_videos/{}/{}.mp4", job.id, epoch_ms);

            match state.object_store.put(&key, bytes, "video/mp4", false).await {
                Ok(()) => {
                    let text_len = job.script_text.as_deref().unwrap_or("").len() as f64;
                    let estimated_duration = (text_len * 0.01).max(0.5);
                    state.usage.commit(job.owner_id, UsageResource::VideoMinutes, estimated_duration).await;

                    state
                        .db
                        .jobs
                        .transition(
                            job.id,
                            JobStatus::Completed,
                            Some(100),
                            Some(key),
                            None,
                            Some(Utc::now()),
                        )
                        .await
                        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
                    info!(job_id = %job.id, "video job completed via worker callback");
                }
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "worker callback upload failed");
                    state
                        .db
                        .jobs
                        .transition(
                            job.id,
                            JobStatus::Failed,
                            Some(0),
                            None,
                            Some(format!("failed to upload worker result: {e}")),
                            Some(Utc::now()),
                        )
                        .await
                        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
                }
            }
        }
        other => {
            warn!(job_id = %job.id, status = other, "worker callback sent an unrecognized status");
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    Ok(Json(CallbackResponse { ok: true }))
}
