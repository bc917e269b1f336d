//! Revision rollback.
//!
//! An incremental update appends objects, a new xref section, and its own
//! `%%EOF`. Truncating at the second-to-last marker drops the newest
//! revision wholesale, including anything a signer added incrementally.

use serde::Serialize;

use crate::engine;
use crate::error::{Error, Result};

/// Result of dropping the newest revision.
#[derive(Debug, Serialize)]
pub struct RollbackResult {
    /// Size before truncation
    pub original_size: usize,
    /// Size after truncation
    pub new_size: usize,
    /// `%%EOF` markers found (= revision count)
    pub revisions_found: usize,
}

/// Truncate the file at its second-to-last `%%EOF`, keeping one trailing
/// newline sequence.
pub fn rollback(buf: &[u8]) -> Result<(Vec<u8>, RollbackResult)> {
    let markers = engine::find_all_eof(buf);
    if markers.len() < 2 {
        return Err(Error::NoPriorRevision(markers.len()));
    }

    let mut cutoff = markers[markers.len() - 2] + b"%%EOF".len();
    if buf.get(cutoff) == Some(&b'\r') {
        cutoff += 1;
        if buf.get(cutoff) == Some(&b'\n') {
            cutoff += 1;
        }
    } else if buf.get(cutoff) == Some(&b'\n') {
        cutoff += 1;
    }

    let truncated = buf[..cutoff].to_vec();
    let result = RollbackResult {
        original_size: buf.len(),
        new_size: truncated.len(),
        revisions_found: markers.len(),
    };
    Ok((truncated, result))
}
