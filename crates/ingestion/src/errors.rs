//! Ingestion error types

use cocounsel_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Document {document_id} has no indexable text")]
    EmptyDocument { document_id: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("Index error: {0}")]
    Index(AppError),
}

impl From<AppError> for IngestionError {
    fn from(e: AppError) -> Self {
        IngestionError::Index(e)
    }
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::EmptyDocument { .. } => AppError::Validation {
                message: e.to_string(),
                field: Some("text".to_string()),
            },
            IngestionError::InvalidDocument(message) => AppError::Validation {
                message,
                field: None,
            },
            IngestionError::InvalidChunking(message) => AppError::Configuration { message },
            IngestionError::Index(inner) => inner,
        }
    }
}
