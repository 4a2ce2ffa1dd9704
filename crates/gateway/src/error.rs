//! Uniform `{ "error": ... }` failure responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use lumen_agent::ChatError;
use lumen_core::error::ArticleError;
use lumen_core::wire::ErrorBody;
use tracing::error;

/// A failure the client sees as a status code plus a short message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        let status = StatusCode::from_u16(e.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, e.user_message())
    }
}

impl From<ArticleError> for ApiError {
    fn from(e: ArticleError) -> Self {
        match e {
            ArticleError::NotFound => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            ArticleError::Conflict => Self::new(StatusCode::CONFLICT, e.to_string()),
            ArticleError::Storage(detail) => {
                error!(error = %detail, "Article storage failed");
                Self::internal("Failed to access articles")
            }
        }
    }
}
