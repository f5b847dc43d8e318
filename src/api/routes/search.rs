use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{DomainError, RetrievalMatch};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

/// `POST /api/search`: the reviews a question would be grounded on, without
/// generating an answer.
pub async fn search_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<RetrievalMatch>>, ApiError> {
    let Json(request) = payload.map_err(|e| DomainError::input(e.body_text()))?;
    let top_k = request.top_k.unwrap_or_else(|| state.pipeline.top_k());

    let matches = state.pipeline.retrieve(&request.query, top_k).await?;
    Ok(Json(matches))
}
