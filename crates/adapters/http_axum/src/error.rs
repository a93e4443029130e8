//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use mailflow_domain::error::{MailflowError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`MailflowError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(MailflowError);

impl From<MailflowError> for ApiError {
    fn from(err: MailflowError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    /// Status code this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MailflowError::Validation(_) => StatusCode::BAD_REQUEST,
            MailflowError::NotFound(_) => StatusCode::NOT_FOUND,
            MailflowError::Delivery(_) => StatusCode::BAD_GATEWAY,
            MailflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Unwrap the underlying error.
    #[must_use]
    pub fn into_inner(self) -> MailflowError {
        self.0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            MailflowError::Validation(err) => err.to_string(),
            MailflowError::NotFound(err) => err.to_string(),
            MailflowError::Delivery(err) => err.to_string(),
            MailflowError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                "internal server error".to_string()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
