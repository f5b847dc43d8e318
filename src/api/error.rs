use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::domain::DomainError;

/// A pipeline failure on its way out of the HTTP boundary.
///
/// Only input errors echo their detail back; provider failures are logged in
/// full and answered with a fixed message.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            DomainError::Input(_) => StatusCode::BAD_REQUEST,
            DomainError::Embedding(_) | DomainError::Generation(_) => StatusCode::BAD_GATEWAY,
            DomainError::Retrieval(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Config(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match &self.0 {
            DomainError::Input(msg) => format!("Invalid request: {}", msg),
            DomainError::Embedding(_) => {
                "The question could not be processed right now. Please try again.".into()
            }
            DomainError::Retrieval(_) => {
                "Professor reviews are temporarily unavailable. Please try again later.".into()
            }
            DomainError::Generation(_) => {
                "The answer could not be generated right now. Please try again.".into()
            }
            DomainError::Config(_) | DomainError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::warn!(kind = self.0.kind(), error = %self.0, "request rejected");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::input("x"), StatusCode::BAD_REQUEST),
            (DomainError::embedding("x"), StatusCode::BAD_GATEWAY),
            (DomainError::retrieval("x"), StatusCode::SERVICE_UNAVAILABLE),
            (DomainError::generation("x"), StatusCode::BAD_GATEWAY),
            (DomainError::config("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_provider_detail_is_not_exposed() {
        let err = ApiError(DomainError::retrieval("401 Unauthorized: bad Api-Key pc-secret"));
        assert!(!err.public_message().contains("pc-secret"));

        let err = ApiError(DomainError::input("conversation is empty"));
        assert!(err.public_message().contains("conversation is empty"));
    }

    #[test]
    fn test_body_is_plain_text() {
        let response = ApiError(DomainError::generation("boom")).into_response();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
