use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use service::errors::ServiceError;

/// JSON error body: `{"error": <title>, "detail": <optional>}`.
#[derive(Debug, Serialize)]
pub struct JsonApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, error: error.into(), detail }
    }

    /// Map a service error. Server-side failures get the caller-facing
    /// `failure` message only; the cause has already been logged.
    pub fn from_service(err: ServiceError, failure: &str) -> Self {
        match err {
            ServiceError::MalformedInput(msg) => {
                warn!(error = %msg, "rejecting malformed request");
                Self::new(StatusCode::BAD_REQUEST, "Malformed request", Some(msg))
            }
            ServiceError::Persistence(_) | ServiceError::Startup(_) | ServiceError::Task(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failure, None)
            }
        }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}
