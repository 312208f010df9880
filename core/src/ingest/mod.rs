//! Load CSV rows into a model store.
//!
//! Each accepted row becomes a [`Record`]: a copy of the call's init values
//! plus one entry per [`FieldIndexMap`] field, read from the mapped column with
//! every `"` removed. The record is then built and saved through the
//! [`ModelStore`], or handed to an after-create hook that does both itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use csvmodel::{FieldIndexMap, IngestOptions, Ingestion};
//!
//! let fields: FieldIndexMap = [("name", 0), ("value", 1)].into_iter().collect();
//! let report = Ingestion::new(&fields)
//!     .options(IngestOptions::default().start_row(1))
//!     .filter(|row| row[1] != "2")
//!     .run("data.csv", &mut store)?;
//! println!("created {}", report.created);
//! ```
//!
//! Errors are not caught: a bad row, a missing column or a store failure ends
//! the call with whatever was saved before it still saved. Wrap the call in a
//! transaction on the store side when that matters.

use std::path::Path;

use crate::config::IngestOptions;
use crate::error::{IngestError, IngestResult, RowResult};
use crate::models::{FieldIndexMap, ModelStore, Record, Row};
use crate::rows::RowSource;

/// Row filter; rows for which it returns false are not created.
pub type RowFilter<'a> = Box<dyn FnMut(&Row) -> bool + 'a>;

/// Hook that replaces the default build-and-save step.
pub type AfterCreate<'a, S> =
    Box<dyn FnMut(&mut S, Record, &Row) -> Result<(), <S as ModelStore>::Error> + 'a>;

/// Counters for one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows read from the source.
    pub examined: usize,
    /// Rows before the start offset.
    pub skipped: usize,
    /// Rows rejected by the filter.
    pub filtered: usize,
    /// Rows accepted, saved or not.
    pub created: usize,
    pub dry_run: bool,
}

/// One configured ingestion call.
pub struct Ingestion<'a, S: ModelStore> {
    fields: &'a FieldIndexMap,
    options: IngestOptions,
    filter: Option<RowFilter<'a>>,
    after_create: Option<AfterCreate<'a, S>>,
}

impl<'a, S: ModelStore> Ingestion<'a, S> {
    pub fn new(fields: &'a FieldIndexMap) -> Self {
        Self {
            fields,
            options: IngestOptions::default(),
            filter: None,
            after_create: None,
        }
    }

    /// Options owned by this call only.
    pub fn options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn filter(mut self, filter: impl FnMut(&Row) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Take over building and saving; the store is passed in so the hook can
    /// persist, but nothing is saved unless the hook does it.
    pub fn after_create(
        mut self,
        hook: impl FnMut(&mut S, Record, &Row) -> Result<(), S::Error> + 'a,
    ) -> Self {
        self.after_create = Some(Box::new(hook));
        self
    }

    /// Ingest the CSV file at `path`.
    pub fn run(self, path: impl AsRef<Path>, store: &mut S) -> IngestResult<IngestReport> {
        let path = path.as_ref();
        let source = RowSource::open(path, &self.options.dialect, self.options.encoding)?;
        tracing::info!(path = %path.display(), fields = self.fields.len(), "ingesting CSV file");
        self.run_rows(source, store)
    }

    /// Ingest an already opened row sequence.
    pub fn run_rows<I>(self, rows: I, store: &mut S) -> IngestResult<IngestReport>
    where
        I: IntoIterator<Item = RowResult<Row>>,
    {
        let Ingestion {
            fields,
            options,
            mut filter,
            mut after_create,
        } = self;

        let template = Record::from(options.init_values);
        let mut report = IngestReport {
            dry_run: options.dry_run,
            ..IngestReport::default()
        };

        for (index, row) in rows.into_iter().enumerate() {
            tracing::debug!(row = index, "on row");
            report.examined += 1;

            if index < options.start_row {
                report.skipped += 1;
                match row {
                    Err(e) if !e.is_decode() => return Err(e.into()),
                    _ => continue,
                }
            }

            let row = row?;
            let accepted = match filter.as_mut() {
                Some(f) => f(&row),
                None => true,
            };
            if !accepted {
                report.filtered += 1;
                continue;
            }

            let record = build_record(&template, fields, &row, index)?;

            if !options.dry_run {
                let persisted = match after_create.as_mut() {
                    Some(hook) => hook(&mut *store, record, &row),
                    None => store
                        .build(record)
                        .and_then(|instance| store.save(instance)),
                };
                persisted.map_err(|e| IngestError::Persistence {
                    row: index,
                    source: Box::new(e),
                })?;
            }

            report.created += 1;
        }

        tracing::info!(
            examined = report.examined,
            skipped = report.skipped,
            filtered = report.filtered,
            created = report.created,
            dry_run = report.dry_run,
            "ingestion finished"
        );
        Ok(report)
    }
}

/// Build the record for one row from the init template and the field map.
pub fn build_record(
    template: &Record,
    fields: &FieldIndexMap,
    row: &Row,
    row_index: usize,
) -> IngestResult<Record> {
    let mut record = template.clone();
    for (field, index) in fields.iter() {
        let cell = row.get(index).ok_or_else(|| IngestError::Schema {
            field: field.to_string(),
            index,
            row: row_index,
            width: row.len(),
        })?;
        record.insert(field, cell.replace('"', ""));
    }
    Ok(record)
}

/// Ingest `path` into `store` with no filter and no hook.
///
/// Returns the number of rows created (or that would be, in a dry run).
pub fn read_csv_into_model<S: ModelStore>(
    path: impl AsRef<Path>,
    store: &mut S,
    fields: &FieldIndexMap,
    options: &IngestOptions,
) -> IngestResult<usize> {
    Ingestion::new(fields)
        .options(options.clone())
        .run(path, store)
        .map(|report| report.created)
}
