//! Dump persisted records to CSV.
//!
//! Field names are resolved once (foreign keys become `<name>_id`), then each
//! record is read attribute by attribute. An absent value is written as the
//! text `None`, so reading the file back yields the string `"None"`, not an
//! absent value.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::config::ExtractOptions;
use crate::error::{RowError, RowResult};
use crate::models::{Attributes, ExtractField, Row};
use crate::rows::{Quoting, RowSink};

/// Text written for an absent attribute.
pub const ABSENT_VALUE: &str = "None";

/// Resolve the column names for `fields`.
pub fn resolve_fields(fields: &[ExtractField]) -> Vec<String> {
    fields.iter().map(ExtractField::column_name).collect()
}

/// Build the row for one record from resolved column names.
pub fn record_row<A: Attributes + ?Sized>(record: &A, columns: &[String]) -> Row {
    columns
        .iter()
        .map(|name| {
            record
                .attribute(name)
                .unwrap_or_else(|| ABSENT_VALUE.to_string())
        })
        .collect()
}

/// Write records to an open sink; returns the number of data rows.
pub fn write_records<W, I, A>(
    sink: &mut RowSink<W>,
    records: I,
    fields: &[ExtractField],
    header: bool,
) -> RowResult<usize>
where
    W: Write,
    I: IntoIterator<Item = A>,
    A: Attributes,
{
    let columns = resolve_fields(fields);
    if header {
        sink.write_row(&columns)?;
    }

    let mut count = 0;
    for record in records {
        sink.write_row(record_row(&record, &columns))?;
        count += 1;
    }
    sink.flush()?;
    Ok(count)
}

/// Write records to a new CSV file at `path` with minimal quoting.
pub fn queryset_to_csv<I, A>(
    path: impl AsRef<Path>,
    records: I,
    fields: &[ExtractField],
    options: &ExtractOptions,
) -> RowResult<usize>
where
    I: IntoIterator<Item = A>,
    A: Attributes,
{
    let path = path.as_ref();
    let mut sink = RowSink::create(path, &options.dialect, Quoting::Minimal)?;
    let count = write_records(&mut sink, records, fields, options.header)?;
    tracing::info!(path = %path.display(), rows = count, header = options.header, "extracted records");
    Ok(count)
}

/// Extract any serializable records through their JSON form.
pub fn serialized_to_csv<I, T>(
    path: impl AsRef<Path>,
    records: I,
    fields: &[ExtractField],
    options: &ExtractOptions,
) -> RowResult<usize>
where
    I: IntoIterator<Item = T>,
    T: Serialize,
{
    let values = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::to_value(record).map_err(|source| RowError::Serialize { index, source })
        })
        .collect::<RowResult<Vec<_>>>()?;
    queryset_to_csv(path, values, fields, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dialect, IngestOptions};
    use crate::ingest::Ingestion;
    use crate::models::testing::MemoryStore;
    use crate::models::{FieldIndexMap, Record};
    use crate::rows::RowSource;
    use serde_json::json;

    fn render(records: &[serde_json::Value], fields: &[ExtractField], header: bool) -> String {
        let mut sink = RowSink::from_writer(Vec::new(), &Dialect::default(), Quoting::Minimal).unwrap();
        write_records(&mut sink, records, fields, header).unwrap();
        String::from_utf8(sink.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_header_and_rows() {
        let records = vec![json!({"title": "Dune", "author_id": 3, "pages": 412})];
        let fields = [ExtractField::new("title"), ExtractField::foreign_key("author")];
        assert_eq!(render(&records, &fields, true), "title,author_id\nDune,3\n");
        assert_eq!(render(&records, &fields, false), "Dune,3\n");
    }

    #[test]
    fn test_absent_values_write_none() {
        let records = vec![json!({"title": null})];
        let fields = [ExtractField::new("title"), ExtractField::new("isbn")];
        assert_eq!(render(&records, &fields, false), "None,None\n");
    }

    #[test]
    fn test_cells_with_delimiter_are_quoted() {
        let records = vec![json!({"title": "Hello, World"})];
        assert_eq!(
            render(&records, &[ExtractField::new("title")], false),
            "|Hello, World|\n"
        );
    }

    #[test]
    fn test_double_quotes_are_kept() {
        let records = vec![json!({"title": "The \"Best\""})];
        assert_eq!(
            render(&records, &[ExtractField::new("title")], false),
            "The \"Best\"\n"
        );
    }

    #[derive(Serialize)]
    struct Book {
        title: String,
        isbn: Option<String>,
        author_id: u32,
    }

    #[test]
    fn test_serialized_records_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.csv");
        let books = vec![
            Book {
                title: "Dune".into(),
                isbn: Some("0441013597".into()),
                author_id: 1,
            },
            Book {
                title: "Emma".into(),
                isbn: None,
                author_id: 2,
            },
        ];
        let fields = [
            ExtractField::new("title"),
            ExtractField::new("isbn"),
            ExtractField::foreign_key("author"),
        ];

        let count = serialized_to_csv(&path, &books, &fields, &ExtractOptions::default()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "title,isbn,author_id\nDune,0441013597,1\nEmma,None,2\n"
        );
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("no JSON form"))
        }
    }

    #[test]
    fn test_serialize_failure_is_reported_as_such() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");

        let err = serialized_to_csv(
            &path,
            [Unserializable],
            &[ExtractField::new("title")],
            &ExtractOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, RowError::Serialize { index: 0, .. }));
        assert_eq!(crate::Error::from(err).kind(), crate::ErrorKind::Serialize);
        assert!(!path.exists());
    }

    #[test]
    fn test_round_trip_through_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.csv");

        let originals: Vec<Record> = vec![
            [("name", "Smith, John"), ("city", "Paris")].into_iter().collect(),
            [("name", "Doe")].into_iter().collect(),
        ];
        let fields = [ExtractField::new("name"), ExtractField::new("city")];
        queryset_to_csv(&path, &originals, &fields, &ExtractOptions::default()).unwrap();

        let mut source = RowSource::open(&path, &Dialect::default(), Default::default()).unwrap();
        let header = source.next().unwrap().unwrap();
        let map = FieldIndexMap::from_header(&header);

        let mut store = MemoryStore::new();
        let report = Ingestion::new(&map)
            .options(IngestOptions::default().start_row(1))
            .run(&path, &mut store)
            .unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(store.saved[0], originals[0]);
        assert_eq!(store.saved[1].get("name"), Some("Doe"));
        assert_eq!(store.saved[1].get("city"), Some(ABSENT_VALUE));
    }
}
