//! Options for the transforms, and import profiles stored as JSON.
//!
//! Every option type derives `Serialize`/`Deserialize` and has a `Default`,
//! so a profile file only needs to spell out what differs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult, RowError, RowResult};
use crate::models::FieldIndexMap;
use crate::rows::encoding::detect_delimiter;

/// Quote character used by the row source and the extraction sink.
pub const DEFAULT_QUOTE: char = '|';

/// Delimiter and quote character of a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    pub delimiter: char,
    pub quote: char,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: DEFAULT_QUOTE,
        }
    }
}

impl Dialect {
    /// Default dialect with a different delimiter.
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    /// Standard `"`-quoted, comma separated dialect.
    pub fn standard() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
        }
    }

    /// Guess the delimiter from the first line of `sample`, quoted with `|`.
    pub fn sniff(sample: &[u8]) -> Self {
        Self::with_delimiter(detect_delimiter(sample, DEFAULT_QUOTE as u8))
    }

    /// Delimiter and quote as the single bytes the csv crate needs.
    pub(crate) fn as_bytes(&self) -> RowResult<(u8, u8)> {
        let byte = |c: char, what: &str| -> RowResult<u8> {
            if c.is_ascii() {
                Ok(c as u8)
            } else {
                Err(RowError::InvalidDialect(format!(
                    "{} '{}' is not a single-byte ASCII character",
                    what, c
                )))
            }
        };
        let delimiter = byte(self.delimiter, "delimiter")?;
        let quote = byte(self.quote, "quote")?;
        if delimiter == quote {
            return Err(RowError::InvalidDialect(format!(
                "delimiter and quote are both '{}'",
                self.delimiter
            )));
        }
        Ok((delimiter, quote))
    }
}

/// Character encoding of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceEncoding {
    /// Strict UTF-8; invalid bytes are a per-row decode error.
    #[default]
    Utf8,
    /// ISO-8859-1 (decoded as its windows-1252 superset).
    Latin1,
    Windows1252,
    /// Sniff the first 64 KiB with chardet.
    Detect,
}

/// Options for one ingestion call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub dialect: Dialect,
    pub encoding: SourceEncoding,
    /// Rows before this zero-based index are skipped entirely.
    pub start_row: usize,
    /// Count rows without building or saving anything.
    pub dry_run: bool,
    /// Values merged into every record before the mapped columns.
    pub init_values: BTreeMap<String, String>,
}

impl IngestOptions {
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.dialect.delimiter = delimiter;
        self
    }

    pub fn start_row(mut self, start_row: usize) -> Self {
        self.start_row = start_row;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn init_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.init_values.insert(field.into(), value.into());
        self
    }

    pub fn encoding(mut self, encoding: SourceEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Options for one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub dialect: Dialect,
    /// Write the resolved field names as the first row.
    pub header: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            header: true,
        }
    }
}

/// A reusable column mapping plus the options it was made for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProfile {
    pub name: String,
    pub fields: FieldIndexMap,
    #[serde(default)]
    pub options: IngestOptions,
}

impl ImportProfile {
    pub fn new(name: impl Into<String>, fields: FieldIndexMap) -> Self {
        Self {
            name: name.into(),
            fields,
            options: IngestOptions::default(),
        }
    }

    /// Load a profile from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: Self = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), name = %profile.name, "loaded import profile");
        Ok(profile)
    }

    /// Write the profile as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)?;
        Ok(())
    }
}
