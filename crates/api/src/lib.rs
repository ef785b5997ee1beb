pub mod error_mapping;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use openapi::ApiDoc;
use routes::{audio_generation, health, realtime, video_generation, worker_callback};
use state::AppState;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Builds the full router (`spec.md` §6): generation endpoints, the
/// worker callback, the realtime bridge, and an unauthenticated health
/// check, all sharing one `AppState`. Every path here is the literal one
/// named in `spec.md` §6.1/§6.2 — no version prefix, since the client
/// surface is pinned to those exact strings.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.frontend_url);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/audio-generation/generate", post(audio_generation::generate))
        .route("/api/audio-generation/status/{taskId}", get(audio_generation::status))
        .route("/api/audio-generation/{id}", axum::routing::delete(audio_generation::delete))
        .route("/api/video-generation/generate", post(video_generation::generate))
        .route("/api/video-generation/status/{taskId}", get(video_generation::status))
        .route("/api/video-generation/{id}", axum::routing::delete(video_generation::delete))
        .route("/worker/callback", post(worker_callback::callback))
        .route("/voice-chat", get(realtime::voice_chat))
        .route("/video-chat", get(realtime::video_chat))
        .merge(build_openapi_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// `/docs` + `/api-docs/openapi.json`, matching the teacher's
/// `build_openapi_routes` (`crates/api/src/lib.rs`).
fn build_openapi_routes() -> Router<AppState> {
    Router::new()
        .route("/docs", get(|| async { Html(SWAGGER_HTML) }))
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
}

const SWAGGER_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Avatar Platform API Documentation</title>
</head>
<body>
    <script id="api-reference" type="application/json" data-url="/api-docs/openapi.json"></script>
    <script src="https://cdn.jsdelivr.net/npm/@scalar/api-reference"></script>
</body>
</html>"#;

/// `frontend_url` is a single configured origin; a trailing slash is
/// tolerated rather than rejected.
fn build_cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = frontend_url.trim_end_matches('/').to_string();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |value, _parts| {
            value.to_str().map(|s| s.trim_end_matches('/') == origin).unwrap_or(false)
        }))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
