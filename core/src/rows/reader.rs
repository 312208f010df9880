//! Lazy row source over a delimited file.

use encoding_rs::{Encoding, UTF_8};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::config::{Dialect, SourceEncoding};
use crate::error::{RowError, RowResult};
use crate::models::Row;

use super::encoding::{decode_cell, resolve_encoding, DETECT_SAMPLE_BYTES};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Remembers whether the input ran out without a final newline.
struct TrackEnd<R> {
    inner: R,
    last: Option<u8>,
    eof: bool,
}

impl<R> TrackEnd<R> {
    fn unterminated(&self) -> bool {
        self.eof && self.last.is_some_and(|b| b != b'\n')
    }
}

impl<R: Read> Read for TrackEnd<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.eof = true;
        } else if n > 0 {
            self.last = Some(buf[n - 1]);
        }
        Ok(n)
    }
}

/// Single-pass iterator of decoded rows, one per physical line.
///
/// A blank line yields an empty row. A row whose bytes do not decode yields
/// `Err(RowError::Decode)` and the iterator moves on to the next row.
pub struct RowSource<R: Read> {
    reader: csv::Reader<TrackEnd<R>>,
    record: csv::ByteRecord,
    encoding: &'static Encoding,
    index: usize,
    blank_lines: u64,
    held: bool,
    finished: bool,
}

impl RowSource<File> {
    /// Open `path` for reading.
    pub fn open(
        path: impl AsRef<Path>,
        dialect: &Dialect,
        encoding: SourceEncoding,
    ) -> RowResult<Self> {
        let path = path.as_ref();
        let open_err = |source| RowError::Open {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(open_err)?;

        let resolved = if encoding == SourceEncoding::Detect {
            let mut sample = Vec::new();
            file.by_ref()
                .take(DETECT_SAMPLE_BYTES)
                .read_to_end(&mut sample)
                .map_err(open_err)?;
            file.seek(SeekFrom::Start(0)).map_err(open_err)?;
            resolve_encoding(encoding, &sample)
        } else {
            resolve_encoding(encoding, &[])
        };

        tracing::debug!(path = %path.display(), encoding = resolved.name(), "opened row source");
        Self::from_reader(file, dialect, resolved)
    }
}

impl<R: Read> RowSource<R> {
    /// Read rows from any reader with an already resolved encoding.
    pub fn from_reader(reader: R, dialect: &Dialect, encoding: &'static Encoding) -> RowResult<Self> {
        let (delimiter, quote) = dialect.as_bytes()?;
        // `\n` only, so every line is counted when its record is read; a
        // trailing `\r` is dropped when decoding.
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .quote(quote)
            .terminator(csv::Terminator::Any(b'\n'))
            .has_headers(false)
            .flexible(true)
            .from_reader(TrackEnd {
                inner: reader,
                last: None,
                eof: false,
            });

        Ok(Self {
            reader,
            record: csv::ByteRecord::new(),
            encoding,
            index: 0,
            blank_lines: 0,
            held: false,
            finished: false,
        })
    }

    /// UTF-8 rows from any reader.
    pub fn from_utf8_reader(reader: R, dialect: &Dialect) -> RowResult<Self> {
        Self::from_reader(reader, dialect, UTF_8)
    }

    /// Index of the next row to be produced.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Read the next record and work out how many blank lines the CSV
    /// reader skipped before it.
    fn advance(&mut self) -> Result<(), csv::Error> {
        let before = self.reader.position().line();
        let found = self.reader.read_byte_record(&mut self.record)?;
        let consumed = self.reader.position().line() - before;

        if found {
            let inner = self.record.as_slice().iter().filter(|&&b| b == b'\n').count() as u64;
            let terminator = u64::from(!self.reader.get_ref().unterminated());
            self.blank_lines = consumed.saturating_sub(inner + terminator);
            self.held = true;
        } else {
            self.blank_lines = consumed;
            self.finished = true;
        }
        Ok(())
    }

    fn decode(&self, row: usize) -> RowResult<Row> {
        let record = &self.record;
        if record.len() == 1 && &record[0] == b"\r" {
            return Ok(Vec::new());
        }

        let last = record.len().saturating_sub(1);
        record
            .iter()
            .enumerate()
            .map(|(column, bytes)| {
                let bytes = if column == last {
                    bytes.strip_suffix(b"\r").unwrap_or(bytes)
                } else {
                    bytes
                };
                let bytes = if row == 0 && column == 0 && self.encoding == UTF_8 {
                    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
                } else {
                    bytes
                };
                decode_cell(bytes, self.encoding)
                    .map(|cell| cell.into_owned())
                    .ok_or(RowError::Decode {
                        row,
                        column,
                        encoding: self.encoding.name(),
                    })
            })
            .collect()
    }
}

impl<R: Read> Iterator for RowSource<R> {
    type Item = RowResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.blank_lines == 0 && !self.held {
            if self.finished {
                return None;
            }
            if let Err(source) = self.advance() {
                let row = self.index;
                self.index += 1;
                return Some(Err(RowError::Read { row, source }));
            }
        }

        let row = self.index;
        if self.blank_lines > 0 {
            self.blank_lines -= 1;
            self.index += 1;
            return Some(Ok(Vec::new()));
        }
        if self.held {
            self.held = false;
            self.index += 1;
            return Some(self.decode(row));
        }
        None
    }
}
