//! Inter-object gap scan and sanitizer.
//!
//! Anything between one object's `endobj` and the next object's header
//! should be whitespace; data parked there is invisible to viewers but
//! survives in the byte stream. The sanitizer overwrites flagged gaps
//! with spaces, which preserves every xref offset.

use serde::Serialize;

use crate::engine;

/// A flagged byte range between two objects.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Gap {
    /// First byte after `endobj`
    pub start: usize,
    /// First byte of the next object header
    pub end: usize,
}

/// Gaps between consecutive objects that contain non-whitespace.
pub fn find_suspicious_gaps(buf: &[u8]) -> Vec<Gap> {
    let spans = engine::find_objects(buf);
    let mut gaps = Vec::new();

    for pair in spans.windows(2) {
        let start = pair[0].end;
        let end = pair[1].start;
        if start >= end {
            continue;
        }
        if !engine::all_whitespace(&buf[start..end]) {
            gaps.push(Gap { start, end });
        }
    }

    gaps
}

/// Overwrite every suspicious gap with spaces. Returns bytes wiped.
pub fn sanitize_gaps(buf: &mut [u8]) -> usize {
    let gaps = find_suspicious_gaps(buf);
    let mut wiped = 0usize;
    for gap in gaps {
        engine::wipe_range(buf, gap.start, gap.end);
        wiped += gap.end - gap.start;
    }
    wiped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_with_gap(gap_content: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        buf.extend_from_slice(gap_content);
        buf.extend_from_slice(b"\n2 0 obj\n<< /Type /Pages /Count 0 /Kids [] >>\nendobj\n");
        buf.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n%%EOF\n");
        buf
    }

    #[test]
    fn test_clean_gaps_not_flagged() {
        assert!(find_suspicious_gaps(&pdf_with_gap(b"  \n\t")).is_empty());
    }

    #[test]
    fn test_hidden_data_flagged_and_wiped() {
        let mut buf = pdf_with_gap(b"SECRET-BYTES");
        let gaps = find_suspicious_gaps(&buf);
        assert_eq!(gaps.len(), 1);

        let before = buf.clone();
        let wiped = sanitize_gaps(&mut buf);
        assert!(wiped >= b"SECRET-BYTES".len());
        assert_eq!(buf.len(), before.len());
        // Bytes outside the gap are untouched
        for (i, (&a, &b)) in before.iter().zip(buf.iter()).enumerate() {
            if i < gaps[0].start || i >= gaps[0].end {
                assert_eq!(a, b, "byte {} changed outside the gap", i);
            }
        }
        assert!(!buf.windows(6).any(|w| w == b"SECRET"));
    }

    #[test]
    fn test_sanitize_idempotent() {
        let mut buf = pdf_with_gap(b"payload");
        sanitize_gaps(&mut buf);
        let once = buf.clone();
        let wiped = sanitize_gaps(&mut buf);
        assert_eq!(wiped, 0);
        assert_eq!(once, buf);
    }
}
