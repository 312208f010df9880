//! Encoding and delimiter detection for source files.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::borrow::Cow;

use crate::config::SourceEncoding;

/// Bytes sampled from the start of a file for charset detection.
pub const DETECT_SAMPLE_BYTES: u64 = 64 * 1024;

/// Candidate delimiters, in order of preference when counts tie.
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Guess the encoding of `sample` with chardet. ASCII and unknown charsets
/// read as UTF-8.
pub fn detect_encoding(sample: &[u8]) -> &'static Encoding {
    let (charset, confidence, _) = chardet::detect(sample);
    let encoding = if charset.is_empty() || charset.eq_ignore_ascii_case("ascii") {
        UTF_8
    } else {
        Encoding::for_label(charset.as_bytes()).unwrap_or(UTF_8)
    };
    tracing::debug!(%charset, confidence, encoding = encoding.name(), "detected source encoding");
    encoding
}

/// Resolve the configured encoding; `sample` is only consulted for
/// [`SourceEncoding::Detect`].
pub fn resolve_encoding(encoding: SourceEncoding, sample: &[u8]) -> &'static Encoding {
    match encoding {
        SourceEncoding::Utf8 => UTF_8,
        SourceEncoding::Latin1 | SourceEncoding::Windows1252 => WINDOWS_1252,
        SourceEncoding::Detect => detect_encoding(sample),
    }
}

/// Decode one cell strictly; `None` if the bytes are malformed.
pub fn decode_cell<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

/// Pick the delimiter that occurs most often, outside `quote`d text, in the
/// first line of `sample`. Defaults to `,`.
pub fn detect_delimiter(sample: &[u8], quote: u8) -> char {
    let mut counts = [0usize; DELIMITERS.len()];
    let mut quoted = false;

    for &byte in sample {
        if byte == quote {
            quoted = !quoted;
        } else if quoted {
            continue;
        } else if byte == b'\n' {
            break;
        } else if let Some(i) = DELIMITERS.iter().position(|&d| d == byte) {
            counts[i] += 1;
        }
    }

    let mut best = 0;
    for (i, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = i;
        }
    }
    char::from(DELIMITERS[best])
}
