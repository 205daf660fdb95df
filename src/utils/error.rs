// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 403 Forbidden

    #[error("SEC Rate limit likely exceeded")]
    RateLimited,

    #[error("Could not find specified filing: {0}")]
    FilingDocNotFound(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),

    #[error("Staging I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bulk retrieval failed for {failed} of {total} CIKs")]
    BatchIncomplete { failed: usize, total: usize },
}

/// Reasons a single filing document is skipped. Never fatal for a ticker.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unexpected filing path format: {0}")]
    MalformedPath(String),

    #[error("Invalid filing year '{year}' in {path}")]
    InvalidYear { year: String, path: String },

    #[error("Could not read filing document {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Duplicate ticker in status table: {0}")]
    DuplicateTicker(String),

    #[error("Record store request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Record store rejected insert ({status}): {body}")]
    Rejected { status: reqwest::StatusCode, body: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
