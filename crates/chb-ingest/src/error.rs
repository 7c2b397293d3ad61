//! Error types for the bulk loader

use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for the ingestion pipeline
///
/// Row-local problems (`Structure`, `Persistence`) are always recovered by
/// skipping the row; only `Fatal` and pre-pipeline infrastructure failures
/// abort a run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("row has {found} columns, expected {expected}")]
    Structure { expected: usize, found: usize },

    #[error("failed to persist company {company_number}: {reason}")]
    Persistence {
        company_number: String,
        reason: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("download error: {0}")]
    Download(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("pipeline failure: {0}")]
    Fatal(String),
}

impl From<zip::result::ZipError> for IngestError {
    fn from(err: zip::result::ZipError) -> Self {
        IngestError::Archive(err.to_string())
    }
}
