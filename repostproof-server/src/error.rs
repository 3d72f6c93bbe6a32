//! Mapping core failures onto structured HTTP error responses.
//!
//! Every failure path out of a handler goes through `ApiError`, so clients
//! always receive a JSON body with an `error` string (and `details` when
//! there is diagnostic text to carry), never an unhandled fault.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use repostproof_core::CoreError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(error: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: error.to_string(),
                details: None,
            },
        }
    }

    pub fn bad_request_with(error: &str, details: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: error.to_string(),
                details: Some(details),
            },
        }
    }

    pub fn internal(error: &str, details: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: error.to_string(),
                details: Some(details),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CommandFailed { ref stderr, .. } if !stderr.trim().is_empty() => {
                Self::internal("FFmpeg failed", stderr.trim().to_string())
            }
            CoreError::CommandFailed { .. }
            | CoreError::CommandStart(..)
            | CoreError::CommandWait(..)
            | CoreError::DependencyNotFound(_) => Self::internal("FFmpeg failed", err.to_string()),
            other => Self::internal("Processing failed", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    #[test]
    fn test_engine_failure_carries_stderr() {
        let err = CoreError::CommandFailed {
            cmd: "ffmpeg".to_string(),
            status: ExitStatus::from_raw(256),
            stderr: "  something broke  \n".to_string(),
        };
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body.error, "FFmpeg failed");
        assert_eq!(api.body.details.as_deref(), Some("something broke"));
    }

    #[test]
    fn test_other_failures_are_generic() {
        let err = CoreError::OutputMissing("/tmp/out.mp4".to_string());
        let api: ApiError = err.into();
        assert_eq!(api.body.error, "Processing failed");
        assert!(api.body.details.unwrap().contains("/tmp/out.mp4"));
    }

    #[test]
    fn test_bad_request_has_no_details() {
        let api = ApiError::bad_request("No file uploaded");
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.body.details.is_none());
    }
}
