//! HTTP error handling
//!
//! Every failure leaves the server as
//! `{ "success": false, "error": { "code", "message", "details"? } }`
//! with the status derived from the code.

use crate::services::PageServiceError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NOT_FOUND: &str = "NOT_FOUND";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const MALFORMED_PATH: &str = "MALFORMED_PATH";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Error body carried inside the failure envelope
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message, UNAUTHORIZED)
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            NOT_FOUND => StatusCode::NOT_FOUND,
            VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            UNAUTHORIZED => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "success": false, "error": self }))).into_response()
    }
}

impl From<PageServiceError> for HttpError {
    fn from(err: PageServiceError) -> Self {
        match err {
            PageServiceError::NotFound { .. } => {
                tracing::debug!(error = %err, "Request target not found");
                HttpError::new(err.to_string(), NOT_FOUND)
            }
            PageServiceError::Validation(message) => {
                tracing::debug!(%message, "Request rejected");
                HttpError::new(message, VALIDATION_ERROR)
            }
            PageServiceError::MalformedPath(path_err) => {
                tracing::error!(error = %path_err, "Stored path failed to decode");
                HttpError::with_details(
                    "Page hierarchy is inconsistent",
                    MALFORMED_PATH,
                    path_err.to_string(),
                )
            }
            PageServiceError::Internal(message) => {
                tracing::error!(%message, "Page operation failed");
                HttpError::with_details("Internal server error", INTERNAL_ERROR, message)
            }
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::with_details("Invalid request body", VALIDATION_ERROR, rejection.body_text())
    }
}

impl From<PathRejection> for HttpError {
    fn from(rejection: PathRejection) -> Self {
        HttpError::with_details("Invalid page id", VALIDATION_ERROR, rejection.body_text())
    }
}
