//! Row sink writing delimited files.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::config::Dialect;
use crate::error::{RowError, RowResult};

/// How cells are quoted on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quoting {
    /// Quote only cells containing the delimiter, the quote or a line break.
    #[default]
    Minimal,
    /// Quote every cell.
    All,
}

impl From<Quoting> for csv::QuoteStyle {
    fn from(quoting: Quoting) -> Self {
        match quoting {
            Quoting::Minimal => csv::QuoteStyle::Necessary,
            Quoting::All => csv::QuoteStyle::Always,
        }
    }
}

/// Writes rows of cells through the csv crate.
pub struct RowSink<W: Write> {
    writer: csv::Writer<W>,
    written: usize,
}

impl RowSink<File> {
    /// Create (or truncate) `path`.
    pub fn create(path: impl AsRef<Path>, dialect: &Dialect, quoting: Quoting) -> RowResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| RowError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), ?quoting, "created row sink");
        Self::from_writer(file, dialect, quoting)
    }
}

impl<W: Write> RowSink<W> {
    pub fn from_writer(writer: W, dialect: &Dialect, quoting: Quoting) -> RowResult<Self> {
        let (delimiter, quote) = dialect.as_bytes()?;
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .quote(quote)
            .quote_style(quoting.into())
            .flexible(true)
            .from_writer(writer);

        Ok(Self { writer, written: 0 })
    }

    pub fn write_row<I, T>(&mut self, row: I) -> RowResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(row).map_err(RowError::Write)?;
        self.written += 1;
        Ok(())
    }

    pub fn write_rows<I, R, T>(&mut self, rows: I) -> RowResult<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Rows written so far.
    pub fn rows_written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> RowResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> RowResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| RowError::Io(e.into_error()))
    }
}
