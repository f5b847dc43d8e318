use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde::Deserialize;

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{ConversationTurn, DomainError};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    /// Overrides `llm.stream` for this request.
    pub stream: Option<bool>,
}

/// `POST /api/chat`: body is the conversation so far, response is the
/// assistant's answer as plain text.
pub async fn chat_handler(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
    payload: Result<Json<Vec<ConversationTurn>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(conversation) = payload.map_err(|e| DomainError::input(e.body_text()))?;
    let stream = query.stream.unwrap_or(state.config.config.llm.stream);

    if !stream {
        let answer = state.pipeline.answer(&conversation).await?;
        return Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], answer).into_response());
    }

    let fragments = state.pipeline.handle(&conversation).await?;

    // The status line is already sent once fragments flow, so a late failure
    // can only end the body early.
    let body = fragments.inspect_err(|e| {
        tracing::error!(kind = e.kind(), error = %e, "answer stream aborted");
    });

    Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], Body::from_stream(body)).into_response())
}
