//! Maps `services::JobError` onto the HTTP status/body contract in
//! `spec.md` §7.

use crate::models::ErrorResponse;
use axum::http::StatusCode;
use axum::Json;
use services::JobError;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn job_error_response(err: JobError) -> ApiError {
    match err {
        JobError::ValidationFailed { field, reason } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::simple("validation_failed", format!("{field}: {reason}"))),
        ),
        JobError::AvatarNotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::simple("avatar_not_found", "avatar not found")),
        ),
        JobError::AvatarIncomplete { missing } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::simple(
                "avatar_incomplete",
                format!("avatar is missing {missing}"),
            )),
        ),
        JobError::QuotaExceeded { resource: _, used, limit } => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::quota_exceeded(used, limit, (limit - used).max(0.0))),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::simple("internal_error", other.to_string())),
        ),
    }
}

pub fn store_error_response(err: database::RepositoryError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::simple("store_error", err.to_string())),
    )
}

pub fn validation_error(field: &str, reason: &str) -> ApiError {
    job_error_response(JobError::ValidationFailed {
        field: field.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn validation_failure_maps_to_400() {
        let (status, Json(body)) = validation_error("text", "must not be empty");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.r#type, "validation_failed");
        assert!(body.error.message.contains("text"));
    }

    #[test]
    fn avatar_not_found_maps_to_404() {
        let (status, Json(body)) = job_error_response(JobError::AvatarNotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.r#type, "avatar_not_found");
    }

    #[test]
    fn quota_exceeded_reports_used_limit_remaining() {
        let (status, Json(body)) = job_error_response(JobError::QuotaExceeded {
            resource: "audio-minutes".to_string(),
            used: 95.0,
            limit: 100.0,
        });
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error.used, Some(95.0));
        assert_eq!(body.error.limit, Some(100.0));
        assert_eq!(body.error.remaining, Some(5.0));
    }

    #[test]
    fn quota_exceeded_remaining_never_goes_negative() {
        let (_, Json(body)) = job_error_response(JobError::QuotaExceeded {
            resource: "video-minutes".to_string(),
            used: 110.0,
            limit: 100.0,
        });
        assert_eq!(body.error.remaining, Some(0.0));
    }

    #[test]
    fn unmapped_errors_fall_back_to_500() {
        let (status, Json(body)) = job_error_response(JobError::ShutdownAborted);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.r#type, "internal_error");
    }
}
