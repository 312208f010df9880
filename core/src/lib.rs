//! # csvmodel - CSV files in and out of model stores
//!
//! Loads CSV rows into records persisted by a [`ModelStore`], dumps records
//! back to CSV, scans rows with a predicate and converts spreadsheets to CSV.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│  RowSource  │────▶│  Ingestion  │────▶│ ModelStore  │
//! │ (| quoted)  │     │ (per-row    │     │ (offset,    │     │ (build +    │
//! │             │     │  decoding)  │     │  filter)    │     │  save)      │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Attributes  │────▶│ Extraction  │────▶│  RowSink    │────▶ CSV File
//! └─────────────┘     └─────────────┘     └─────────────┘
//!
//! ┌─────────────┐     ┌─────────────┐
//! │  Workbook   │────▶│  RowSink    │────▶ <name>.csv (all quoted)
//! │ (calamine)  │     │             │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csvmodel::{CsvFile, FieldIndexMap, IngestOptions};
//!
//! let fields: FieldIndexMap = [("name", 0), ("value", 1)].into_iter().collect();
//! let created = CsvFile::new("data.csv")
//!     .read_into_model(&mut store, &fields, &IngestOptions::default().start_row(1))?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Layered error types
//! - [`models`] - Rows, records, field maps and collaborator traits
//! - [`config`] - Dialects, options and import profiles
//! - [`rows`] - Row source and sink
//! - [`ingest`] - CSV to model store
//! - [`extract`] - Records to CSV
//! - [`scan`] - Predicate scan
//! - [`spreadsheet`] - Workbook to CSV
//! - [`file`] - A CSV path bound to all of the above

// Core modules
pub mod error;
pub mod models;

// Configuration
pub mod config;

// Rows
pub mod rows;

// Transforms
pub mod extract;
pub mod ingest;
pub mod scan;
pub mod spreadsheet;

// Facade
pub mod file;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BoxError, ConfigError, Error, ErrorKind, IngestError, Result, RowError, SpreadsheetError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Attributes, ExtractField, FieldIndexMap, ModelStore, Record, Row};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{Dialect, ExtractOptions, ImportProfile, IngestOptions, SourceEncoding};

// =============================================================================
// Re-exports - Rows
// =============================================================================

pub use rows::{detect_delimiter, detect_encoding, Quoting, RowSink, RowSource};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use extract::{queryset_to_csv, serialized_to_csv, write_records, ABSENT_VALUE};
pub use ingest::{read_csv_into_model, IngestReport, Ingestion};
pub use scan::{
    check_pred_against_rows, scan_rows, try_check_pred_against_rows, try_scan_rows, ScanEntry,
    UNDECODABLE_MARKER,
};
pub use spreadsheet::{csv_from_excel, write_workbook_csv, CalamineWorkbook, Workbook};

// =============================================================================
// Re-exports - Facade
// =============================================================================

pub use file::CsvFile;
