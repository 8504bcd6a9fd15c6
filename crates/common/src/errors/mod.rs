//! Error types for the CoCounsel engine
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for each failure mode of the retrieval and analysis path
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling
//!
//! Not every variant reaches a caller. `EmbeddingDegraded` and
//! `SynthesisUnavailable` are produced and consumed inside the engine, where
//! they trigger the degraded-mode output; the per-call provider errors are
//! converted into low-confidence stub analyses by the orchestrator.

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
    DimensionMismatch,

    // Resource errors (4xxx)
    NotFound,
    UnknownProvider,

    // Index errors (7xxx)
    IndexUnavailable,

    // External service errors (8xxx)
    EmbeddingDegraded,
    ProviderUnavailable,
    ProviderTimeout,
    ProviderBadResponse,
    AllProvidersFailed,
    SynthesisUnavailable,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::DimensionMismatch => 1002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::UnknownProvider => 4002,

            // Index (7xxx)
            ErrorCode::IndexUnavailable => 7001,

            // External (8xxx)
            ErrorCode::EmbeddingDegraded => 8001,
            ErrorCode::ProviderUnavailable => 8002,
            ErrorCode::ProviderTimeout => 8003,
            ErrorCode::ProviderBadResponse => 8004,
            ErrorCode::AllProvidersFailed => 8005,
            ErrorCode::SynthesisUnavailable => 8006,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
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

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Unknown provider: {provider}")]
    UnknownProvider { provider: String },

    // Index errors
    #[error("Index unavailable: {message}")]
    IndexUnavailable { message: String },

    // External service errors
    #[error("Embedding degraded to local fallback: {message}")]
    EmbeddingDegraded { message: String },

    #[error("Provider {provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("Provider {provider} timed out after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    #[error("Provider {provider} returned a bad response: {message}")]
    ProviderBadResponse { provider: String, message: String },

    #[error("All providers failed: {}", attempted.join(", "))]
    AllProvidersFailed { attempted: Vec<String> },

    #[error("Synthesis unavailable: {message}")]
    SynthesisUnavailable { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::UnknownProvider { .. } => ErrorCode::UnknownProvider,
            AppError::IndexUnavailable { .. } => ErrorCode::IndexUnavailable,
            AppError::EmbeddingDegraded { .. } => ErrorCode::EmbeddingDegraded,
            AppError::ProviderUnavailable { .. } => ErrorCode::ProviderUnavailable,
            AppError::ProviderTimeout { .. } => ErrorCode::ProviderTimeout,
            AppError::ProviderBadResponse { .. } => ErrorCode::ProviderBadResponse,
            AppError::AllProvidersFailed { .. } => ErrorCode::AllProvidersFailed,
            AppError::SynthesisUnavailable { .. } => ErrorCode::SynthesisUnavailable,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::DimensionMismatch { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::UnknownProvider { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::EmbeddingDegraded { .. } |
            AppError::ProviderUnavailable { .. } |
            AppError::ProviderBadResponse { .. } |
            AppError::AllProvidersFailed { .. } |
            AppError::SynthesisUnavailable { .. } => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            AppError::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,

            // 503 Service Unavailable
            AppError::IndexUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether this error is the failure of a single provider call.
    ///
    /// These are fatal to the call but never to an orchestration run.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            AppError::ProviderUnavailable { .. }
                | AppError::ProviderTimeout { .. }
                | AppError::ProviderBadResponse { .. }
                | AppError::UnknownProvider { .. }
        )
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

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
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
        AppError::Internal {
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
