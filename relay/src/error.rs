//! Error types for the chat relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_common::ErrorBody;

/// Generic message placed in the `error` field of every error reply.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Failures of the POST pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("API key is not configured")]
    MissingCredential,

    #[error("Provider request failed: {0}")]
    Upstream(String),
}

impl Error {
    /// HTTP status for this error.
    ///
    /// Everything maps to 500 unless `sharpen` is set, in which case request
    /// shape problems become 400 and provider failures 502.
    pub fn status_code(&self, sharpen: bool) -> StatusCode {
        if !sharpen {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn into_response_with(self, sharpen: bool) -> Response {
        let status = self.status_code(sharpen);
        let body = Json(ErrorBody {
            error: GENERIC_ERROR_MESSAGE.to_string(),
            details: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::BadRequest(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_500() {
        assert_eq!(
            Error::BadRequest("x".into()).status_code(false),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Upstream("x".into()).status_code(false),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_sharpened_status() {
        assert_eq!(
            Error::BadRequest("x".into()).status_code(true),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::MissingCredential.status_code(true),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Upstream("x".into()).status_code(true),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_json_error_becomes_bad_request() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(err.to_string().starts_with("Invalid request: "));
    }
}
