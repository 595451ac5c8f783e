//! Error types for price_sync

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Unified error type for price_sync operations
#[derive(Debug, Error)]
pub enum PriceError {
    /// Multipart body could not be read (bad boundary, truncated body, size limit)
    #[error("Failed to read multipart form: {0}")]
    Multipart(#[from] MultipartError),
    /// Upload did not contain the `file` form field
    #[error("Missing form field: {0}")]
    MissingFile(&'static str),
    /// Uploaded bytes are not a readable ZIP archive
    #[error("Failed to open zip archive: {0}")]
    CorruptArchive(#[from] zip::result::ZipError),
    /// Export archive could not be assembled
    #[error("Failed to write zip archive: {0}")]
    ArchiveWrite(zip::result::ZipError),
    /// Archive has neither `data.csv` nor `sample_data/data.csv`
    #[error("No data.csv in archive")]
    CsvEntryNotFound,
    /// Extracted CSV inflates past the decompression cap
    #[error("data.csv expands beyond {0} bytes")]
    CsvTooLarge(u64),
    /// CSV payload could not be decoded
    #[error("Failed to read CSV: {0}")]
    MalformedCsv(#[from] csv::Error),
    /// Export rows could not be encoded
    #[error("Failed to write CSV: {0}")]
    CsvWrite(csv::Error),
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Existing prices table was created for a different id strategy
    #[error("prices.id is {found}, but id strategy '{strategy}' needs {expected}")]
    SchemaMismatch {
        strategy: crate::config::IdStrategy,
        expected: &'static str,
        found: String,
    },
    /// Stored row could not be turned back into a price record
    #[error("Corrupt row in prices table: {0}")]
    CorruptRow(String),
    /// File or buffer I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Blocking worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PriceError {
    /// True when the request itself was at fault (bad upload), not the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PriceError::Multipart(_)
                | PriceError::MissingFile(_)
                | PriceError::CorruptArchive(_)
                | PriceError::CsvEntryNotFound
                | PriceError::CsvTooLarge(_)
                | PriceError::MalformedCsv(_)
        )
    }

    /// HTTP status reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PriceError::Multipart(e) => {
                // body limit violations surface as 413, everything else is a bad form
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                }
            }
            PriceError::CsvTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PriceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        } else {
            log::warn!("Rejected upload: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

/// Result alias for price_sync operations
pub type Result<T> = std::result::Result<T, PriceError>;
