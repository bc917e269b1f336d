//! Full-spectrum cleaning.
//!
//! Composes the attachment wipe, soft-mask canonicalization, and the
//! duplicate-stream wipe into one pass. Every phase is length-preserving,
//! and a phase failure is logged without stopping the later phases.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde::Serialize;

use crate::config::ScanConfig;
use crate::engine::{self, ObjectSpan};
use crate::error::Result;

use super::canonical::canonicalize_smasks;
use super::duplicates::wipe_duplicates;

lazy_static! {
    static ref NAMES_ARRAY: Regex =
        Regex::new(r"/EmbeddedFiles[ \t\r\n]*<<[ \t\r\n]*/Names[ \t\r\n]*\[([^\]]*)\]").unwrap();
    static ref REF: Regex = Regex::new(r"(\d+)[ \t\r\n]+\d+[ \t\r\n]+R").unwrap();
    static ref EF_STREAM_REF: Regex =
        Regex::new(r"/EF[ \t\r\n]*<<[ \t\r\n]*/(?:F|UF)[ \t\r\n]+(\d+)[ \t\r\n]+\d+[ \t\r\n]+R")
            .unwrap();
}

/// Per-phase counts from a full clean.
#[derive(Debug, Default, Serialize)]
pub struct CleanAllResult {
    /// Embedded file streams wiped
    pub attachments_wiped: usize,
    /// Soft masks canonicalized
    pub smasks_canonicalized: usize,
    /// Duplicate streams wiped
    pub duplicates_wiped: usize,
}

/// Run every length-preserving cleaning phase over the buffer.
pub fn clean_all(buf: &mut Vec<u8>, config: &ScanConfig) -> Result<CleanAllResult> {
    let mut result = CleanAllResult::default();

    log::info!("phase 1: attachment neutralization");
    result.attachments_wiped = wipe_attachments(buf);
    log::info!("neutralized {} embedded file streams", result.attachments_wiped);

    log::info!("phase 2: soft-mask canonicalization");
    match canonicalize_smasks(buf) {
        Ok(count) => {
            result.smasks_canonicalized = count;
            log::info!("canonicalized {} soft masks", count);
        }
        Err(err) => log::warn!("soft-mask phase failed: {}", err),
    }

    log::info!("phase 3: duplicate-stream wipe");
    result.duplicates_wiped = wipe_duplicates(buf, config);
    log::info!("wiped {} duplicated streams", result.duplicates_wiped);

    Ok(result)
}

/// Wipe the stream bytes of every file referenced by the embedded-files
/// name tree, regardless of suspicion score.
fn wipe_attachments(buf: &mut [u8]) -> usize {
    let names = match NAMES_ARRAY.captures(buf) {
        Some(c) => c.get(1).map(|m| m.as_bytes().to_vec()),
        None => None,
    };
    let names = match names {
        Some(n) => n,
        None => return 0,
    };

    let objects: HashMap<u32, ObjectSpan> = engine::find_objects(buf)
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut wiped = 0usize;
    let mut seen = std::collections::HashSet::new();
    for capture in REF.captures_iter(&names) {
        let id: u32 = match std::str::from_utf8(&capture[1]).ok().and_then(|s| s.parse().ok()) {
            Some(id) => id,
            None => continue,
        };
        if !seen.insert(id) {
            continue;
        }
        let span = match objects.get(&id) {
            Some(s) => s,
            None => continue,
        };
        // The tree may point at a file-spec or directly at the stream
        let stream_span = match span.stream {
            Some(s) => Some(s),
            None => EF_STREAM_REF
                .captures(&buf[span.body_start..span.body_end])
                .and_then(|c| std::str::from_utf8(&c[1]).ok()?.parse::<u32>().ok())
                .and_then(|stream_id| objects.get(&stream_id))
                .and_then(|s| s.stream),
        };
        if let Some(stream) = stream_span {
            engine::wipe_range(buf, stream.start, stream.end);
            wiped += 1;
        }
    }
    wiped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defender::{verify_bytes, Anchor, InjectContext};
    use crate::payload;

    const KEY: &[u8; 32] = b"kkkkkkkkkkkkkkkkkkkkkkkkkkkkkkkk";

    fn signed_all_anchors() -> Vec<u8> {
        let pixels = vec![0x80u8; 400 * 400];
        let data = engine::encode_stream_flate(&pixels);
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
        buf.extend_from_slice(
            b"3 0 obj\n<< /Type /Page /Parent 2 0 R /Resources << /XObject << /Im0 4 0 R >> >> >>\nendobj\n",
        );
        buf.extend_from_slice(
            format!(
                "4 0 obj\n<< /Type /XObject /Subtype /Image /Width 400 /Height 400 /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
                data.len()
            )
            .as_bytes(),
        );
        buf.extend_from_slice(&data);
        buf.extend_from_slice(b"\nendstream\nendobj\n");
        buf.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n%%EOF\n");

        let sealed = payload::encrypt(b"UserID:12345", KEY).unwrap();
        let style = crate::config::WatermarkStyle::default();
        let ctx = InjectContext {
            payload: &sealed,
            message: "UserID:12345",
            style: &style,
            rasterizer: None,
        };
        let buf = Anchor::Attachment.inject(&buf, &ctx).unwrap();
        let buf = Anchor::Smask.inject(&buf, &ctx).unwrap();
        Anchor::Content.inject(&buf, &ctx).unwrap()
    }

    #[test]
    fn test_clean_all_counts_phases() {
        let mut buf = signed_all_anchors();
        let before_len = buf.len();
        let result = clean_all(&mut buf, &ScanConfig::new()).unwrap();
        assert_eq!(buf.len(), before_len);
        assert_eq!(result.attachments_wiped, 1);
        assert_eq!(result.smasks_canonicalized, 1);
        // Attachment and SMask channels are dead
        assert!(Anchor::Attachment.extract(&buf).is_err() || {
            // The wiped stream decodes to spaces, which cannot decrypt
            let sealed = Anchor::Attachment.extract(&buf).unwrap();
            payload::decrypt(&sealed, KEY).is_err()
        });
        assert!(Anchor::Smask.extract(&buf).is_err());
    }

    #[test]
    fn test_clean_all_on_clean_file() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        buf.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n%%EOF\n");
        let result = clean_all(&mut buf, &ScanConfig::new()).unwrap();
        assert_eq!(result.attachments_wiped, 0);
        assert_eq!(result.smasks_canonicalized, 0);
        assert_eq!(result.duplicates_wiped, 0);
    }

    #[test]
    fn test_content_survives_clean_all_on_single_page() {
        // One page means the duplicate threshold floor (2) is never met,
        // so the content anchor survives full-spectrum cleaning
        let mut buf = signed_all_anchors();
        clean_all(&mut buf, &ScanConfig::new()).unwrap();
        let verified = verify_bytes(&buf, KEY, None).unwrap();
        assert_eq!(verified.message, "UserID:12345");
        assert_eq!(verified.anchor, "Content");
    }
}
