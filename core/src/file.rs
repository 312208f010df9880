//! A CSV file path bound to the transforms.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::{Dialect, ExtractOptions, ImportProfile, IngestOptions, SourceEncoding};
use crate::error::{IngestResult, RowError, RowResult, SpreadsheetResult};
use crate::extract::queryset_to_csv;
use crate::ingest::{IngestReport, Ingestion};
use crate::models::{Attributes, ExtractField, FieldIndexMap, ModelStore, Row};
use crate::rows::encoding::DETECT_SAMPLE_BYTES;
use crate::rows::RowSource;
use crate::scan::{check_pred_against_rows, ScanEntry};
use crate::spreadsheet::csv_from_excel;

/// Operations on one CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFile {
    path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert a spreadsheet into `<csv_name>.csv` and bind to the result.
    pub fn from_excel<R: Read>(excel_file: R, csv_name: &str) -> SpreadsheetResult<Self> {
        csv_from_excel(excel_file, csv_name).map(Self::new)
    }

    /// Guess the dialect from the start of the file.
    pub fn sniff_dialect(&self) -> RowResult<Dialect> {
        let file = File::open(&self.path).map_err(|source| RowError::Open {
            path: self.path.clone(),
            source,
        })?;
        let mut sample = Vec::new();
        file.take(DETECT_SAMPLE_BYTES).read_to_end(&mut sample)?;
        Ok(Dialect::sniff(&sample))
    }

    /// Open the file as a row source.
    pub fn rows(&self, dialect: &Dialect, encoding: SourceEncoding) -> RowResult<RowSource<File>> {
        RowSource::open(&self.path, dialect, encoding)
    }

    /// Load every row into `store`; returns the created count.
    pub fn read_into_model<S: ModelStore>(
        &self,
        store: &mut S,
        fields: &FieldIndexMap,
        options: &IngestOptions,
    ) -> IngestResult<usize> {
        crate::ingest::read_csv_into_model(&self.path, store, fields, options)
    }

    /// Run a configured ingestion (filter, hook) against this file.
    pub fn ingest<S: ModelStore>(
        &self,
        ingestion: Ingestion<'_, S>,
        store: &mut S,
    ) -> IngestResult<IngestReport> {
        ingestion.run(&self.path, store)
    }

    /// Ingest with a stored profile.
    pub fn ingest_with_profile<S: ModelStore>(
        &self,
        profile: &ImportProfile,
        store: &mut S,
    ) -> IngestResult<IngestReport> {
        tracing::debug!(profile = %profile.name, "using import profile");
        Ingestion::new(&profile.fields)
            .options(profile.options.clone())
            .run(&self.path, store)
    }

    /// Rows satisfying `pred`, with markers for undecodable rows.
    pub fn check_pred_against_rows<P>(
        &self,
        pred: P,
        dialect: &Dialect,
        encoding: SourceEncoding,
    ) -> RowResult<Vec<ScanEntry>>
    where
        P: FnMut(&Row) -> bool,
    {
        check_pred_against_rows(&self.path, pred, dialect, encoding)
    }

    /// Overwrite this file with `records`.
    pub fn write_queryset<I, A>(
        &self,
        records: I,
        fields: &[ExtractField],
        options: &ExtractOptions,
    ) -> RowResult<usize>
    where
        I: IntoIterator<Item = A>,
        A: Attributes,
    {
        queryset_to_csv(&self.path, records, fields, options)
    }
}
