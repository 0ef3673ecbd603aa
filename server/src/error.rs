use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use narration_core::NarrationError;
use serde::Serialize;
use thiserror::Error;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Narration generation failed: {0}")]
    GenerationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<NarrationError> for ApiError {
    fn from(err: NarrationError) -> Self {
        match err {
            NarrationError::InvalidRequest(reason) => ApiError::InvalidInput(reason.to_string()),
            NarrationError::GenerationFailed(cause) => ApiError::GenerationFailed(cause),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::GenerationFailed(cause) => {
                tracing::error!("Narration generation failed: {}", cause);
                (StatusCode::BAD_GATEWAY, format!("Narration generation failed: {}", cause))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_errors_map_to_statuses() {
        let invalid: ApiError = NarrationError::InvalidRequest("text is empty").into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let failed: ApiError = NarrationError::GenerationFailed("quota exceeded".into()).into();
        assert_eq!(failed.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
