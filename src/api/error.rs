//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use crate::query::QueryError;
use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query validation or execution error
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Query(QueryError::InvalidTimeRange(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_TIME_RANGE")
            }
            ApiError::Query(QueryError::Timeout(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, "QUERY_TIMEOUT")
            }
            ApiError::Query(QueryError::Storage(e)) | ApiError::Storage(e) => match e {
                StorageError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "STORE_TIMEOUT"),
                StorageError::Redis(_) => (StatusCode::BAD_GATEWAY, "STORE_UNAVAILABLE"),
                StorageError::InvalidTimeRange => (StatusCode::BAD_REQUEST, "INVALID_TIME_RANGE"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Rejected request"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
