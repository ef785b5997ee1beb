//! `GET /health` (`spec.md` §6.1).

use crate::models::{HealthResponse, HealthServices};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use std::time::Duration;

/// Lightweight reachability probe, not a full round-trip call
/// (`SPEC_FULL.md` §6): a HEAD request with a short timeout. Any response at
/// all, even a 4xx/5xx, means the upstream is reachable; only a connect/
/// timeout failure is reported unhealthy.
async fn probe(base_url: &str) -> &'static str {
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(3)).build() {
        Ok(client) => client,
        Err(_) => return "unhealthy",
    };

    match client.head(base_url).send().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service health", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.db.pool().get().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let (voice_service, video_service) = tokio::join!(
        probe(&state.config.voice_service.rest_base_url),
        probe(&state.config.video_service.rest_base_url),
    );

    Json(HealthResponse {
        status: "healthy",
        services: HealthServices {
            voice_service,
            video_service,
            database,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes_with_expected_shape() {
        let response = HealthResponse {
            status: "healthy",
            services: HealthServices {
                voice_service: "healthy",
                video_service: "healthy",
                database: "healthy",
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["services"]["database"], "healthy");
    }
}
