//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced by the content services.
///
/// Sanitizer faults never appear here; they degrade to plain text inside
/// the sanitizer. Unknown block types are not errors either.
#[derive(Debug, Error)]
pub enum ContentError {
    /// A payload or request cannot be repaired with a safe default.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced document or block does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The backing store failed.
    #[error("storage error")]
    Storage(#[from] anyhow::Error),
}

impl ContentError {
    pub fn document_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "document",
            id: id.to_string(),
        }
    }

    pub fn block_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "block",
            id: id.to_string(),
        }
    }
}

/// Result type alias using ContentError.
pub type ContentResult<T> = Result<T, ContentError>;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validation(message) => AppError::BadRequest(message),
            ContentError::NotFound { .. } => AppError::NotFound,
            ContentError::Storage(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Internal details go to the log, not the client.
        let body = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn content_errors_map_to_http_status() {
        let cases = [
            (
                AppError::from(ContentError::Validation("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(ContentError::block_not_found("abc")),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(ContentError::Storage(anyhow::anyhow!("disk"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = ContentError::document_not_found("42");
        assert_eq!(err.to_string(), "document 42 not found");
    }
}
