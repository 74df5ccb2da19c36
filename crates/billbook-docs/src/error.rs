//! # Document Error Types
//!
//! Failures while reading spreadsheets or rendering documents.
//!
//! A bad cell is not an error: the row is skipped and listed in the
//! [`ImportReport`](crate::import::ImportReport). Errors here mean the whole
//! file or document could not be processed.

use thiserror::Error;

/// Import/export errors.
#[derive(Debug, Error)]
pub enum DocError {
    /// The file is not readable as CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No header matches a required field.
    ///
    /// ## Example
    /// A stock sheet with columns `Code, Qty` has no name or price column.
    #[error("Missing required column '{field}' (accepted headers: {accepted})")]
    MissingColumn { field: String, accepted: String },

    /// Template failed to load or render.
    #[error("Template error: {0}")]
    Template(String),

    /// Export options out of range.
    #[error("Invalid export option: {0}")]
    InvalidOption(String),

    /// Writing the output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tera::Error> for DocError {
    fn from(err: tera::Error) -> Self {
        // tera nests the useful part in `source()`.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        DocError::Template(message)
    }
}

/// Result type for import/export operations.
pub type DocResult<T> = Result<T, DocError>;
