//! OpenAPI documentation aggregation, grounded on the teacher's
//! `crates/api/src/openapi.rs` (one `#[derive(OpenApi)]` struct listing every
//! handler + schema, served at `/api-docs/openapi.json`).

use crate::models::*;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Avatar Platform Control-Plane API",
        description = "Generation job submission/status, the worker callback, and the realtime voice/video chat bridge.",
        version = "1.0.0",
        license(name = "MIT")
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::audio_generation::generate,
        crate::routes::audio_generation::status,
        crate::routes::audio_generation::delete,
        crate::routes::video_generation::generate,
        crate::routes::video_generation::status,
        crate::routes::video_generation::delete,
        crate::routes::worker_callback::callback,
    ),
    components(schemas(
        ErrorResponse,
        ErrorDetail,
        WireInputType,
        GenerateVideoRequest,
        GenerateAudioRequest,
        GenerateResponse,
        GenerationStatusResponse,
        HealthResponse,
        HealthServices,
        crate::routes::worker_callback::CallbackResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_generation_does_not_panic() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Avatar Platform Control-Plane API");
        assert!(!spec.paths.paths.is_empty());
    }
}
