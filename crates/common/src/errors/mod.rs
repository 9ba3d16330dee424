//! Error types for LegalRAG services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured `{"error": ...}` responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    PayloadTooLarge,

    // Resource errors (4xxx)
    NotFound,
    CollectionNotFound,
    NoMatchFound,

    // Document errors (5xxx)
    PdfParseError,

    // External service errors (8xxx)
    UpstreamError,
    EmbeddingError,
    GenerationError,
    RequestTimeout,

    // Internal errors (9xxx)
    InternalError,
    StorageError,
    ConfigurationError,
    SerializationError,

    // Service unavailable
    LibraryNotLoaded,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::PayloadTooLarge => 1004,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::CollectionNotFound => 4002,
            ErrorCode::NoMatchFound => 4003,

            // Documents (5xxx)
            ErrorCode::PdfParseError => 5001,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::EmbeddingError => 8002,
            ErrorCode::GenerationError => 8004,
            ErrorCode::RequestTimeout => 8005,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::StorageError => 9004,

            ErrorCode::LibraryNotLoaded => 9999,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Payload too large: request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Context not found for collection {id}. Please upload the file first.")]
    CollectionNotFound { id: String },

    #[error("No relevant information found.")]
    NoMatchFound,

    // Document errors
    #[error("Failed to process PDF: {message}")]
    PdfParse { message: String },

    // External service errors
    #[error("Embedding service error: {message}")]
    EmbeddingError { message: String },

    #[error("Generation service error: {message}")]
    GenerationError { message: String },

    #[error("Request timed out after {timeout_ms}ms")]
    RequestTimeout { timeout_ms: u64 },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Index storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Legal documents not loaded yet.")]
    LibraryNotLoaded,

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a validation failure without a field
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Shorthand for a missing request field
    pub fn missing(field: impl Into<String>) -> Self {
        AppError::MissingField { field: field.into() }
    }

    /// Shorthand for a storage failure
    pub fn storage(message: impl Into<String>) -> Self {
        AppError::Storage { message: message.into() }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::CollectionNotFound { .. } => ErrorCode::CollectionNotFound,
            AppError::NoMatchFound => ErrorCode::NoMatchFound,
            AppError::PdfParse { .. } => ErrorCode::PdfParseError,
            AppError::EmbeddingError { .. } => ErrorCode::EmbeddingError,
            AppError::RequestTimeout { .. } => ErrorCode::RequestTimeout,
            AppError::GenerationError { .. } => ErrorCode::GenerationError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::LibraryNotLoaded => ErrorCode::LibraryNotLoaded,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::MissingField { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::CollectionNotFound { .. } |
            AppError::NoMatchFound => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 422 Unprocessable Entity
            AppError::PdfParse { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 500 Internal Server Error
            AppError::Internal { .. } |
            AppError::Storage { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::EmbeddingError { .. } |
            AppError::GenerationError { .. } |
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::LibraryNotLoaded => StatusCode::SERVICE_UNAVAILABLE,

            // 504 Gateway Timeout
            AppError::RequestTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match self {
            AppError::Validation { field, .. } => field,
            AppError::MissingField { field } => Some(field),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage {
            message: err.to_string()
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::CollectionNotFound { id: "abc".into() };
        assert_eq!(err.code(), ErrorCode::CollectionNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("upload the file first"));
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "No text provided.".into(),
            field: Some("document_text".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_remote_failures_are_bad_gateway() {
        let embed = AppError::EmbeddingError { message: "quota".into() };
        let generate = AppError::GenerationError { message: "timeout".into() };
        assert_eq!(embed.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(generate.status_code(), StatusCode::BAD_GATEWAY);
        assert!(embed.is_server_error());
    }

    #[test]
    fn test_limits_map_to_their_statuses() {
        let too_large = AppError::PayloadTooLarge { limit: 1024 };
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.code(), ErrorCode::PayloadTooLarge);

        let timed_out = AppError::RequestTimeout { timeout_ms: 300_000 };
        assert_eq!(timed_out.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timed_out.code(), ErrorCode::RequestTimeout);
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorResponse {
            error: ErrorDetails {
                code: AppError::NoMatchFound.code(),
                message: AppError::NoMatchFound.to_string(),
                field: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "NO_MATCH_FOUND");
        assert_eq!(json["error"]["message"], "No relevant information found.");
        assert!(json["error"].get("field").is_none());
    }
}
