use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use argus_core::error::ScrapeError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `ScrapeError`.
pub struct ApiError(pub ScrapeError);

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            ScrapeError::InvalidDefinition(_) => (StatusCode::BAD_REQUEST, "invalid_definition"),
            ScrapeError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            ScrapeError::JobTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            ScrapeError::JournalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "journal_error"),
            ScrapeError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.0.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
