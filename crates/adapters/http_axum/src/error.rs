//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hookflow_domain::error::{HookflowError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`HookflowError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(HookflowError);

impl From<HookflowError> for ApiError {
    fn from(err: HookflowError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            HookflowError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            HookflowError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            HookflowError::Configuration(err) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            HookflowError::Transition(err) => (StatusCode::CONFLICT, err.to_string()),
            HookflowError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            HookflowError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
