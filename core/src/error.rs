//! Error types for the CSV/model transforms.
//!
//! Errors are layered the same way the transforms are:
//!
//! - [`RowError`] - reading or writing delimited rows
//! - [`IngestError`] - loading rows into a model store
//! - [`SpreadsheetError`] - converting workbooks to CSV
//! - [`ConfigError`] - loading and saving import profiles
//! - [`Error`] - top-level wrapper with an [`ErrorKind`] for coarse matching
//!
//! Conversion is automatic via `From`, so `?` works across layers.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Row Errors
// =============================================================================

/// Errors while reading or writing delimited rows.
#[derive(Debug, Error)]
pub enum RowError {
    /// The file could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The underlying CSV reader failed.
    #[error("cannot read row {row}: {source}")]
    Read {
        row: usize,
        #[source]
        source: csv::Error,
    },

    /// The underlying CSV writer failed.
    #[error("cannot write row: {0}")]
    Write(#[source] csv::Error),

    /// Plain I/O failure (flush, sampling).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cell is not valid in the configured encoding.
    #[error("row {row}, column {column}: bytes are not valid {encoding}")]
    Decode {
        row: usize,
        column: usize,
        encoding: &'static str,
    },

    /// A record could not be turned into JSON for extraction.
    #[error("cannot serialize record {index}: {source}")]
    Serialize {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Delimiter or quote character cannot be used by the CSV engine.
    #[error("invalid dialect: {0}")]
    InvalidDialect(String),
}

impl RowError {
    /// True for per-row decoding failures, which scans recover from.
    pub fn is_decode(&self) -> bool {
        matches!(self, RowError::Decode { .. })
    }
}

// =============================================================================
// Ingestion Errors
// =============================================================================

/// Errors while loading rows into a model store.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading the source failed.
    #[error(transparent)]
    Rows(#[from] RowError),

    /// The field index map points past the end of a row.
    #[error("field '{field}' maps to column {index} but row {row} has {width} cells")]
    Schema {
        field: String,
        index: usize,
        row: usize,
        width: usize,
    },

    /// The store (or the after-create hook) refused the record.
    #[error("persisting row {row} failed: {source}")]
    Persistence {
        row: usize,
        #[source]
        source: BoxError,
    },
}

// =============================================================================
// Spreadsheet Errors
// =============================================================================

/// Errors while converting a workbook to CSV.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    /// The bytes are not a workbook calamine understands.
    #[error("cannot open workbook: {0}")]
    Open(#[source] calamine::Error),

    /// A named sheet could not be read.
    #[error("cannot read sheet '{name}': {source}")]
    Sheet {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Writing the CSV output failed.
    #[error(transparent)]
    Rows(#[from] RowError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading or saving an import profile.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profile I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Top-level Error
// =============================================================================

/// Coarse classification of any crate error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Schema,
    Decode,
    Persistence,
    Serialize,
    Spreadsheet,
    Config,
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("row error: {0}")]
    Rows(#[from] RowError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Classify the error without matching every nested variant.
    pub fn kind(&self) -> ErrorKind {
        fn row_kind(err: &RowError) -> ErrorKind {
            match err {
                RowError::Decode { .. } => ErrorKind::Decode,
                RowError::Serialize { .. } => ErrorKind::Serialize,
                _ => ErrorKind::Io,
            }
        }

        match self {
            Error::Rows(e) => row_kind(e),
            Error::Ingest(IngestError::Rows(e)) => row_kind(e),
            Error::Ingest(IngestError::Schema { .. }) => ErrorKind::Schema,
            Error::Ingest(IngestError::Persistence { .. }) => ErrorKind::Persistence,
            Error::Spreadsheet(SpreadsheetError::Rows(e)) => row_kind(e),
            Error::Spreadsheet(_) => ErrorKind::Spreadsheet,
            Error::Config(_) => ErrorKind::Config,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for row operations.
pub type RowResult<T> = std::result::Result<T, RowError>;

/// Result type for ingestion.
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Result type for spreadsheet conversion.
pub type SpreadsheetResult<T> = std::result::Result<T, SpreadsheetError>;

/// Result type for profile loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for the whole crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let row_err = RowError::Decode {
            row: 3,
            column: 1,
            encoding: "UTF-8",
        };
        let ingest_err: IngestError = row_err.into();
        let err: Error = ingest_err.into();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_schema_error_format() {
        let err = IngestError::Schema {
            field: "title".into(),
            index: 4,
            row: 7,
            width: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("title"));
        assert!(msg.contains("column 4"));
        assert_eq!(Error::from(err).kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_persistence_kind() {
        let err = IngestError::Persistence {
            row: 0,
            source: "unique constraint".into(),
        };
        assert_eq!(Error::from(err).kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_open_error_is_io() {
        let err = RowError::Open {
            path: PathBuf::from("missing.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        };
        assert!(!err.is_decode());
        assert_eq!(Error::from(err).kind(), ErrorKind::Io);
    }
}
