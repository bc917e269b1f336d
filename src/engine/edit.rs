//! Length-preserving in-place edits.
//!
//! Every offset recorded in the original cross-reference table must stay
//! valid, so a replacement never changes buffer length: shorter data is
//! padded, longer data is refused with [`Error::LengthExceeded`] and the
//! caller decides whether to fall back or re-serialize the file.

use crate::error::{Error, Result};

/// Replace `buf[start..end]` with `replacement`, padding with `pad` when
/// the replacement is shorter. Fails if it is longer.
pub fn overwrite_range_padded(
    buf: &mut [u8],
    start: usize,
    end: usize,
    replacement: &[u8],
    pad: u8,
) -> Result<()> {
    let range = end - start;
    if replacement.len() > range {
        return Err(Error::LengthExceeded {
            replacement: replacement.len(),
            range,
        });
    }
    buf[start..start + replacement.len()].copy_from_slice(replacement);
    for b in &mut buf[start + replacement.len()..end] {
        *b = pad;
    }
    Ok(())
}

/// Replace `buf[start..end]` with `replacement`, padding the tail with
/// spaces (0x20).
pub fn overwrite_range(buf: &mut [u8], start: usize, end: usize, replacement: &[u8]) -> Result<()> {
    overwrite_range_padded(buf, start, end, replacement, 0x20)
}

/// Overwrite `buf[start..end]` entirely with spaces.
pub fn wipe_range(buf: &mut [u8], start: usize, end: usize) {
    for b in &mut buf[start..end] {
        *b = 0x20;
    }
}
