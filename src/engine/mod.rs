//! Byte-level PDF engine shared by the defender and the attacker.
//!
//! The engine is deliberately heuristic: objects are located by regex, not
//! by a conforming parser. It is correct on well-formed files produced by
//! common writers; a hostile crafted PDF may confuse it, and both peers
//! accept that limitation symmetrically.
//!
//! Every operation treats the buffer as opaque binary and indexes by
//! absolute byte offset. In-place edits preserve buffer length exactly so
//! that offsets referenced by the cross-reference table stay valid; edits
//! that cannot preserve length go through [`crate::rewrite`] instead.

mod codec;
mod edit;
mod locator;

pub use codec::{decode_stream, encode_stream_flate, inflate};
pub use edit::{overwrite_range, overwrite_range_padded, wipe_range};
pub use locator::{
    count_pages, find_all_eof, find_last_eof, find_objects, find_references, find_root,
    find_stream, ObjectSpan, StreamSpan,
};

/// PDF whitespace set: space, tab, LF, CR, FF.
pub fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, 0x20 | 0x09 | 0x0A | 0x0D | 0x0C)
}

/// True if every byte in the slice is PDF whitespace.
pub fn all_whitespace(data: &[u8]) -> bool {
    data.iter().all(|&b| is_pdf_whitespace(b))
}
