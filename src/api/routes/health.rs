use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub backend: String,
    pub corpus: String,
    pub reviews: usize,
    pub top_k: usize,
    pub dimension: usize,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// The pipeline only exists once the corpus is loaded and providers are
/// built, so reaching this handler means the service is ready.
pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let pipeline = &state.pipeline;

    Json(ReadinessResponse {
        status: "ready".into(),
        backend: pipeline.backend().into(),
        corpus: pipeline.corpus().source().into(),
        reviews: pipeline.corpus().len(),
        top_k: pipeline.top_k(),
        dimension: pipeline.dimension(),
    })
}
