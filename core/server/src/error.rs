//! Mapping of domain errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use resumevault_common::Error;

/// An error on its way out of a handler.
///
/// Client errors echo their message. Everything else is logged and
/// replaced with `fallback`, so internals never reach the client.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    fallback: &'static str,
}

impl ApiError {
    /// Use `fallback` as the message if `error` is internal.
    pub fn with_fallback(error: Error, fallback: &'static str) -> Self {
        Self { error, fallback }
    }

    /// Status code for an error.
    pub fn status(error: &Error) -> StatusCode {
        match error {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::TokenExpired | Error::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Error::AccountNotFound | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::QuotaExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Storage(_)
            | Error::Network(_)
            | Error::Timeout(_)
            | Error::Database(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Configuration(_)
            | Error::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self::with_fallback(error, "Internal server error")
    }
}

/// Attach a route-specific message for internal failures.
pub trait ResultExt<T> {
    fn or_fail(self, fallback: &'static str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for resumevault_common::Result<T> {
    fn or_fail(self, fallback: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::with_fallback(e, fallback))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = Self::status(&self.error);
        let message = if self.error.is_client_error() {
            self.error.to_string()
        } else {
            error!(error = %self.error, "Request failed");
            self.fallback.to_string()
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
