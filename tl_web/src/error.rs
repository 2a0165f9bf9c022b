//! ABOUTME: Error handling utilities for JSON error responses
//! ABOUTME: Maps core errors to status codes; 5xx bodies never leak internals

use crate::models::ErrorResponse;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;
use tl_core::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

/// API error wrapper carrying the status and the JSON body sent to the client
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ErrorResponse) -> Self {
        Self { status, body }
    }

    /// Create a bad request error
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(error, "validation"),
        )
    }

    /// Create a not found error
    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorResponse::new(error, "not_found"))
    }

    /// Translate a core error. `context` is the generic text shown to the
    /// client for server-side failures; details only go to the log.
    pub fn from_core(err: Error, context: &str) -> Self {
        let kind = err.kind();
        match err {
            Error::Validation(msg) | Error::Conflict(msg) => {
                Self::new(StatusCode::BAD_REQUEST, ErrorResponse::new(msg, kind))
            }
            Error::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, ErrorResponse::new(msg, kind)),
            Error::PoolTimeout(msg) => {
                warn!(kind, detail = %msg, "{}", context);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(context, kind),
                )
            }
            other => {
                error!(kind, detail = %other, "{}", context);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(context, kind),
                )
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.body.error)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(&self.body)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let fields: Vec<_> = errors.field_errors().keys().map(|f| f.to_string()).collect();
        warn!(fields = ?fields, "Request validation failed");
        Self::bad_request("Invalid input")
    }
}

/// Attach a client-facing context to a core result
pub trait ResultExt<T> {
    fn or_api(self, context: &str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for tl_core::Result<T> {
    fn or_api(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::from_core(e, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (Error::Conflict("dup".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (Error::PoolTimeout("busy".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::Database("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_core(err, "ctx").status_code(), status);
        }
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = ApiError::from_core(
            Error::Database("password authentication failed for user".into()),
            "Failed to fetch inventory",
        );
        assert_eq!(err.body.error, "Failed to fetch inventory");
        assert_eq!(err.body.kind, "database");
        assert!(!serde_json::to_string(&err.body).unwrap().contains("password"));
    }

    #[test]
    fn test_client_errors_keep_message() {
        let err = ApiError::from_core(Error::NotFound("Product not found".into()), "ctx");
        assert_eq!(err.body.error, "Product not found");
        assert_eq!(err.body.kind, "not_found");
    }
}
