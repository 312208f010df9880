//! Reading and writing delimited rows.
//!
//! - [`reader`] - lazy [`RowSource`](reader::RowSource) with per-row decoding
//! - [`writer`] - [`RowSink`](writer::RowSink) with minimal or full quoting
//! - [`encoding`] - charset and delimiter detection

pub mod encoding;
pub mod reader;
pub mod writer;

pub use encoding::{detect_delimiter, detect_encoding};
pub use reader::RowSource;
pub use writer::{Quoting, RowSink};
