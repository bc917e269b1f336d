//! Tail scan, tail truncation, and structural integrity check.

use serde::Serialize;

use crate::engine;
use crate::error::{Error, Result};

/// Result of scanning the bytes after the last `%%EOF`.
#[derive(Debug, Clone, Serialize)]
pub struct TailScan {
    /// Non-whitespace data follows the last `%%EOF`
    pub suspicious: bool,
    /// Byte count after the marker (whitespace included)
    pub trailing_bytes: usize,
    /// Offset of the last `%%EOF`
    pub eof_offset: usize,
    /// Total file size
    pub file_size: usize,
}

/// Classify bytes after the last `%%EOF`.
///
/// A trailing newline (or any whitespace) is normal; anything else is
/// suspicious.
pub fn scan_tail(buf: &[u8]) -> Result<TailScan> {
    let eof_offset = engine::find_last_eof(buf).ok_or(Error::NoEofMarker)?;
    let marker_end = eof_offset + b"%%EOF".len();
    let trailing = &buf[marker_end..];

    Ok(TailScan {
        suspicious: !engine::all_whitespace(trailing),
        trailing_bytes: trailing.len(),
        eof_offset,
        file_size: buf.len(),
    })
}

/// Drop everything after the last `%%EOF`, keeping at most one trailing
/// newline sequence. Returns the cleaned bytes and the number removed.
pub fn clean_tail(buf: &[u8]) -> Result<(Vec<u8>, usize)> {
    let eof_offset = engine::find_last_eof(buf).ok_or(Error::NoEofMarker)?;
    let mut cutoff = eof_offset + b"%%EOF".len();

    if buf.get(cutoff) == Some(&b'\r') {
        cutoff += 1;
        if buf.get(cutoff) == Some(&b'\n') {
            cutoff += 1;
        }
    } else if buf.get(cutoff) == Some(&b'\n') {
        cutoff += 1;
    }

    let removed = buf.len() - cutoff;
    Ok((buf[..cutoff].to_vec(), removed))
}

/// Coarse structural validity report.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    /// File begins with `%PDF`
    pub header_ok: bool,
    /// File ends with `%%EOF` after whitespace trim
    pub eof_ok: bool,
    /// Number of `xref` keywords found
    pub xref_tables: usize,
}

impl IntegrityReport {
    /// All checks passed.
    pub fn is_valid(&self) -> bool {
        self.header_ok && self.eof_ok && self.xref_tables > 0
    }
}

/// Check header, trailing `%%EOF`, and xref presence.
pub fn check_integrity(buf: &[u8]) -> IntegrityReport {
    let trimmed_end = buf
        .iter()
        .rposition(|&b| !engine::is_pdf_whitespace(b))
        .map(|i| i + 1)
        .unwrap_or(0);
    IntegrityReport {
        header_ok: buf.starts_with(b"%PDF"),
        eof_ok: buf[..trimmed_end].ends_with(b"%%EOF"),
        xref_tables: count_sub(buf, b"xref"),
    }
}

fn count_sub(haystack: &[u8], needle: &[u8]) -> usize {
    if haystack.len() < needle.len() {
        return 0;
    }
    haystack.windows(needle.len()).filter(|w| w == &needle).count()
}
