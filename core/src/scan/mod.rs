//! Best-effort predicate scan over CSV rows.
//!
//! Rows that fail to decode, or for which a fallible predicate errors, are
//! not fatal: they show up in the result as [`ScanEntry::Undecodable`] and the
//! scan carries on. Only failures to open or read the file end the scan.

use std::fmt;
use std::path::Path;

use crate::config::{Dialect, SourceEncoding};
use crate::error::{RowError, RowResult};
use crate::models::Row;
use crate::rows::RowSource;

/// Marker text for rows the predicate could not be evaluated on.
pub const UNDECODABLE_MARKER: &str = "<unicode decode error>";

/// One entry of a scan result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEntry {
    /// A row the predicate accepted.
    Match(Row),
    /// A row that could not be evaluated.
    Undecodable,
}

impl ScanEntry {
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            ScanEntry::Match(row) => Some(row),
            ScanEntry::Undecodable => None,
        }
    }

    pub fn is_undecodable(&self) -> bool {
        matches!(self, ScanEntry::Undecodable)
    }
}

impl fmt::Display for ScanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEntry::Match(row) => write!(f, "{:?}", row),
            ScanEntry::Undecodable => f.write_str(UNDECODABLE_MARKER),
        }
    }
}

/// Scan rows with a fallible predicate.
pub fn try_scan_rows<I, P, E>(rows: I, mut pred: P) -> RowResult<Vec<ScanEntry>>
where
    I: IntoIterator<Item = RowResult<Row>>,
    P: FnMut(&Row) -> Result<bool, E>,
    E: fmt::Display,
{
    let mut result = Vec::new();

    for (index, row) in rows.into_iter().enumerate() {
        tracing::debug!(row = index, "on row");

        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_decode() => {
                tracing::warn!(row = index, error = %e, "row could not be decoded");
                result.push(ScanEntry::Undecodable);
                continue;
            }
            Err(e) => return Err(e),
        };

        match pred(&row) {
            Ok(true) => result.push(ScanEntry::Match(row)),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(row = index, error = %e, "predicate failed");
                result.push(ScanEntry::Undecodable);
            }
        }
    }

    Ok(result)
}

/// Scan rows with an infallible predicate.
pub fn scan_rows<I, P>(rows: I, mut pred: P) -> RowResult<Vec<ScanEntry>>
where
    I: IntoIterator<Item = RowResult<Row>>,
    P: FnMut(&Row) -> bool,
{
    try_scan_rows(rows, |row| Ok::<_, RowError>(pred(row)))
}

/// Rows of the file at `path` that satisfy `pred`.
pub fn check_pred_against_rows<P>(
    path: impl AsRef<Path>,
    pred: P,
    dialect: &Dialect,
    encoding: SourceEncoding,
) -> RowResult<Vec<ScanEntry>>
where
    P: FnMut(&Row) -> bool,
{
    let path = path.as_ref();
    let source = RowSource::open(path, dialect, encoding)?;
    let result = scan_rows(source, pred)?;
    tracing::info!(path = %path.display(), entries = result.len(), "predicate scan finished");
    Ok(result)
}

/// Like [`check_pred_against_rows`], with a predicate that may fail.
pub fn try_check_pred_against_rows<P, E>(
    path: impl AsRef<Path>,
    pred: P,
    dialect: &Dialect,
    encoding: SourceEncoding,
) -> RowResult<Vec<ScanEntry>>
where
    P: FnMut(&Row) -> Result<bool, E>,
    E: fmt::Display,
{
    let source = RowSource::open(path, dialect, encoding)?;
    try_scan_rows(source, pred)
}
