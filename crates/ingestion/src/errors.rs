//! Ingestion error types

use legalrag_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("PDF parse error for {source_name}: {message}")]
    PdfParseError { source_name: String, message: String },

    #[error("No text content extracted from {0}")]
    EmptyDocument(String),

    #[error("Chunking error: {0}")]
    ChunkingError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::PdfParseError { .. } | IngestionError::EmptyDocument(_) => AppError::PdfParse {
                message: e.to_string(),
            },
            IngestionError::FileNotFound(path) => AppError::NotFound {
                resource_type: "document".to_string(),
                id: path,
            },
            IngestionError::IoError(io) => AppError::Storage {
                message: io.to_string(),
            },
            IngestionError::ChunkingError(_) | IngestionError::TaskFailed(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}
