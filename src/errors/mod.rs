//! Error handling module for the course platform backend.
//!
//! Provides one error taxonomy with mapping to HTTP status codes and response envelopes.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Malformed identifier or missing required field
    Validation(String),
    /// Document already exists (duplicate enrollment)
    Conflict(String),
    /// Database error, carrying the driver's message
    Database(String),
    /// Internal server error, carrying the underlying cause
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            // Clients treat a duplicate enrollment as a plain bad request.
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the client-facing error message.
    pub fn message(&self) -> &str {
        match self {
            AppError::NotFound(msg) | AppError::Validation(msg) | AppError::Conflict(msg) => msg,
            AppError::Database(_) => "Database error",
            AppError::Internal(_) => "Internal server error",
        }
    }

    /// Underlying cause of a server-side failure.
    pub fn detail(&self) -> Option<&str> {
        match self {
            AppError::Database(detail) | AppError::Internal(detail) => Some(detail),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())?;
        if let Some(detail) = self.detail() {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("Invalid identifier: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Error response body.
///
/// `message` is what clients display; `error` carries the underlying cause
/// and is only present on 5xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            code: error.error_code().to_string(),
            message: error.message().to_string(),
            error: error.detail().map(str::to_string),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("Already enrolled".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_malformed_uuid_is_validation_error() {
        let err: AppError = uuid::Uuid::parse_str("not-an-id").unwrap_err().into();
        assert_eq!(err.error_code(), codes::VALIDATION_ERROR);
        assert!(err.message().starts_with("Invalid identifier"));
    }

    #[test]
    fn test_error_envelope() {
        let body = ErrorResponse::new(&AppError::NotFound("Course not found".into()));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["code"], "NOT_FOUND");
        assert_eq!(value["message"], "Course not found");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_server_error_body_carries_cause() {
        let body = ErrorResponse::new(&AppError::Database("disk I/O error".into()));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["code"], "DATABASE_ERROR");
        assert_eq!(value["message"], "Database error");
        assert_eq!(value["error"], "disk I/O error");
    }
}
