//! Spreadsheet to CSV conversion.
//!
//! Every sheet is read in workbook order and all of their rows are written,
//! one after another, to a single fully quoted CSV file. Cells are converted
//! to their text form and nothing else: no filtering, no type handling.
//! Sheets keep their layout from cell A1, so empty leading rows and columns
//! come out as empty cells.

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use crate::config::Dialect;
use crate::error::{RowError, SpreadsheetError, SpreadsheetResult};
use crate::models::Row;
use crate::rows::{Quoting, RowSink};

/// Read access to a parsed workbook.
pub trait Workbook {
    /// Sheet names in the workbook's own order.
    fn sheet_names(&self) -> Vec<String>;

    /// Text rows of one sheet.
    fn sheet_rows(&mut self, name: &str) -> SpreadsheetResult<Vec<Row>>;
}

/// Workbook parsed by calamine (xls, xlsx, xlsb, ods).
pub struct CalamineWorkbook {
    sheets: Sheets<Cursor<Vec<u8>>>,
}

impl CalamineWorkbook {
    pub fn from_bytes(bytes: Vec<u8>) -> SpreadsheetResult<Self> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(SpreadsheetError::Open)?;
        Ok(Self { sheets })
    }

    pub fn from_reader<R: Read>(mut reader: R) -> SpreadsheetResult<Self> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| SpreadsheetError::Rows(RowError::Io(e)))?;
        Self::from_bytes(bytes)
    }
}

impl Workbook for CalamineWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn sheet_rows(&mut self, name: &str) -> SpreadsheetResult<Vec<Row>> {
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|e| SpreadsheetError::Sheet {
                name: name.to_string(),
                source: Box::new(e),
            })?;
        let Some((top, left)) = range.start() else {
            return Ok(Vec::new());
        };
        let left = left as usize;

        let mut rows: Vec<Row> = (0..top)
            .map(|_| vec![String::new(); left + range.width()])
            .collect();
        rows.extend(range.rows().map(|cells| cells_to_row(cells, left)));
        Ok(rows)
    }
}

/// Text form of a row of cells, after `left` empty cells.
fn cells_to_row(cells: &[Data], left: usize) -> Row {
    let mut row = vec![String::new(); left];
    row.extend(cells.iter().map(ToString::to_string));
    row
}

/// All rows of all sheets, in sheet order.
pub fn workbook_rows<W: Workbook + ?Sized>(workbook: &mut W) -> SpreadsheetResult<Vec<Row>> {
    let mut all_rows = Vec::new();
    for name in workbook.sheet_names() {
        let rows = workbook.sheet_rows(&name)?;
        tracing::debug!(sheet = %name, rows = rows.len(), "read worksheet");
        all_rows.extend(rows);
    }
    Ok(all_rows)
}

/// Write every row of `workbook` to `out`, all cells quoted.
pub fn write_workbook<W, O>(workbook: &mut W, out: O) -> SpreadsheetResult<usize>
where
    W: Workbook + ?Sized,
    O: Write,
{
    let rows = workbook_rows(workbook)?;
    let mut sink = RowSink::from_writer(out, &Dialect::standard(), Quoting::All)?;
    sink.write_rows(&rows)?;
    sink.flush()?;
    Ok(rows.len())
}

/// Write every row of `workbook` to the file at `path`, overwriting it.
pub fn write_workbook_csv<W: Workbook + ?Sized>(
    workbook: &mut W,
    path: impl AsRef<Path>,
) -> SpreadsheetResult<usize> {
    let path = path.as_ref();
    let rows = workbook_rows(workbook)?;
    let mut sink = RowSink::create(path, &Dialect::standard(), Quoting::All)?;
    sink.write_rows(&rows)?;
    sink.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "converted workbook to CSV");
    Ok(rows.len())
}

/// Convert spreadsheet contents read from `excel_file` into `<csv_name>.csv`
/// in the current directory. Returns the path written.
pub fn csv_from_excel<R: Read>(excel_file: R, csv_name: &str) -> SpreadsheetResult<PathBuf> {
    let mut workbook = CalamineWorkbook::from_reader(excel_file)?;
    let path = PathBuf::from(format!("{}.csv", csv_name));
    write_workbook_csv(&mut workbook, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeWorkbook {
        sheets: Vec<(String, Vec<Row>)>,
        broken: Option<String>,
    }

    impl FakeWorkbook {
        fn new(sheets: &[(&str, &[&[&str]])]) -> Self {
            let sheets = sheets
                .iter()
                .map(|(name, rows)| {
                    let rows = rows
                        .iter()
                        .map(|r| r.iter().map(|c| c.to_string()).collect())
                        .collect();
                    (name.to_string(), rows)
                })
                .collect();
            Self {
                sheets,
                broken: None,
            }
        }
    }

    impl Workbook for FakeWorkbook {
        fn sheet_names(&self) -> Vec<String> {
            self.sheets.iter().map(|(name, _)| name.clone()).collect()
        }

        fn sheet_rows(&mut self, name: &str) -> SpreadsheetResult<Vec<Row>> {
            if self.broken.as_deref() == Some(name) {
                return Err(SpreadsheetError::Sheet {
                    name: name.to_string(),
                    source: "corrupt sheet".into(),
                });
            }
            Ok(self
                .sheets
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default())
        }
    }

    fn two_sheets() -> FakeWorkbook {
        FakeWorkbook::new(&[
            ("Works", &[&["title", "year"], &["Bolero", "1928"]]),
            (
                "Creators",
                &[&["name"], &["Ravel, Maurice"], &["Satie"]],
            ),
        ])
    }

    #[test]
    fn test_rows_in_sheet_order() {
        let rows = workbook_rows(&mut two_sheets()).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], vec!["title", "year"]);
        assert_eq!(rows[2], vec!["name"]);
        assert_eq!(rows[4], vec!["Satie"]);
    }

    #[test]
    fn test_written_fully_quoted() {
        let mut out = Vec::new();
        let count = write_workbook(&mut two_sheets(), &mut out).unwrap();
        assert_eq!(count, 5);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"title\",\"year\"\n\"Bolero\",\"1928\"\n\"name\"\n\"Ravel, Maurice\"\n\"Satie\"\n"
        );
    }

    #[test]
    fn test_write_to_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        std::fs::write(&path, "stale\n").unwrap();

        let count = write_workbook_csv(&mut two_sheets(), &path).unwrap();
        assert_eq!(count, 5);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 5);
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_output_ingests_with_quotes_stripped() {
        use crate::config::IngestOptions;
        use crate::ingest::Ingestion;
        use crate::models::testing::MemoryStore;
        use crate::models::FieldIndexMap;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("works.csv");
        let mut workbook = FakeWorkbook::new(&[("Works", &[&["title", "year"], &["Bolero", "1928"]])]);
        write_workbook_csv(&mut workbook, &path).unwrap();

        let fields: FieldIndexMap = [("title", 0), ("year", 1)].into_iter().collect();
        let mut store = MemoryStore::new();
        Ingestion::new(&fields)
            .options(IngestOptions::default().start_row(1))
            .run(&path, &mut store)
            .unwrap();

        assert_eq!(store.saved.len(), 1);
        assert_eq!(store.saved[0].get("title"), Some("Bolero"));
        assert_eq!(store.saved[0].get("year"), Some("1928"));
    }

    #[test]
    fn test_broken_sheet_fails() {
        let mut workbook = two_sheets();
        workbook.broken = Some("Creators".into());
        let err = workbook_rows(&mut workbook).unwrap_err();
        assert!(err.to_string().contains("Creators"));
    }

    #[test]
    fn test_empty_workbook() {
        let mut out = Vec::new();
        let count = write_workbook(&mut FakeWorkbook::new(&[]), &mut out).unwrap();
        assert_eq!(count, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let err = CalamineWorkbook::from_bytes(b"not a spreadsheet".to_vec())
            .err()
            .unwrap();
        assert!(matches!(err, SpreadsheetError::Open(_)));
    }

    #[test]
    fn test_cells_to_row_uses_text_form() {
        let row = cells_to_row(
            &[
                Data::String("a".into()),
                Data::Int(7),
                Data::Bool(true),
                Data::Empty,
            ],
            0,
        );
        assert_eq!(row, vec!["a", "7", "true", ""]);
        assert_eq!(cells_to_row(&[Data::Int(1)], 2), vec!["", "", "1"]);
    }

    fn xlsx(sheets: &[(&str, &[(u32, u16, &str)])]) -> Vec<u8> {
        let mut book = rust_xlsxwriter::Workbook::new();
        for (name, cells) in sheets {
            let sheet = book.add_worksheet().set_name(*name).unwrap();
            for &(row, col, text) in cells.iter() {
                match text.parse::<f64>() {
                    Ok(number) => sheet.write_number(row, col, number).unwrap(),
                    Err(_) => sheet.write_string(row, col, text).unwrap(),
                };
            }
        }
        book.save_to_buffer().unwrap()
    }

    #[test]
    fn test_xlsx_to_csv_file() {
        let bytes = xlsx(&[
            ("Works", &[(0, 0, "title"), (0, 1, "year"), (1, 0, "Bolero"), (1, 1, "1928")]),
            ("Creators", &[(0, 0, "name"), (1, 0, "Ravel, Maurice"), (2, 0, "Satie")]),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("catalog");

        let path = csv_from_excel(Cursor::new(bytes), name.to_str().unwrap()).unwrap();
        assert_eq!(path, dir.path().join("catalog.csv"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "\"title\",\"year\"\n\"Bolero\",\"1928\"\n\"name\"\n\"Ravel, Maurice\"\n\"Satie\"\n"
        );
    }

    #[test]
    fn test_xlsx_sheet_order() {
        let bytes = xlsx(&[("Second", &[(0, 0, "b")]), ("First", &[(0, 0, "a")])]);
        let mut workbook = CalamineWorkbook::from_bytes(bytes).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Second", "First"]);
        assert_eq!(workbook_rows(&mut workbook).unwrap(), vec![vec!["b"], vec!["a"]]);
    }

    #[test]
    fn test_xlsx_keeps_leading_empty_rows_and_columns() {
        let bytes = xlsx(&[(
            "Works",
            &[(1, 1, "title"), (1, 2, "year"), (2, 1, "Bolero"), (2, 2, "1928")],
        )]);
        let mut workbook = CalamineWorkbook::from_bytes(bytes).unwrap();

        let mut out = Vec::new();
        let count = write_workbook(&mut workbook, &mut out).unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"\",\"\",\"\"\n\"\",\"title\",\"year\"\n\"\",\"Bolero\",\"1928\"\n"
        );
    }

    #[test]
    fn test_empty_sheet_has_no_rows() {
        let bytes = xlsx(&[("Blank", &[])]);
        let mut workbook = CalamineWorkbook::from_bytes(bytes).unwrap();
        assert!(workbook.sheet_rows("Blank").unwrap().is_empty());
    }
}
