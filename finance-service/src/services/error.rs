//! Errors raised by the statement ingestion pipeline.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type '{0}'. Please upload a PDF or CSV.")]
    UnsupportedFileType(String),

    #[error("Could not read statement file: {0}")]
    UnreadableFile(String),

    #[error("Failed to process statement with AI: {0}")]
    ExtractionFailure(String),

    #[error("Failed to save transactions: {0}")]
    PersistenceFailure(String),
}

impl IngestError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::UnsupportedFileType(_) => "unsupported_file_type",
            IngestError::UnreadableFile(_) => "unreadable_file",
            IngestError::ExtractionFailure(_) => "extraction_failure",
            IngestError::PersistenceFailure(_) => "persistence_failure",
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedFileType(_) | IngestError::UnreadableFile(_) => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            IngestError::ExtractionFailure(_) | IngestError::PersistenceFailure(_) => {
                AppError::ProcessingFailed(err.to_string())
            }
        }
    }
}
