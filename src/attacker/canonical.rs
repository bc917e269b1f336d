//! Soft-mask canonicalization.
//!
//! Recompressing a mask stream with a fixed encoder preserves the decoded
//! pixel values while destroying anything riding in the compressed
//! representation: the recompressed stream is written over the original
//! and the remainder zero-padded, so an extractor that trusts the stream
//! region to be exactly one DEFLATE stream finds foreign tail bytes and
//! gives up. Rendering is unaffected because viewers stop at the end of
//! the zlib stream.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::engine;
use crate::error::Result;

lazy_static! {
    static ref SMASK_REF: Regex =
        Regex::new(r"/SMask[ \t\r\n]+(\d+)[ \t\r\n]+(\d+)[ \t\r\n]+R").unwrap();
}

/// Structural 1x1 masks and similar are left alone.
const MIN_DECODED_LEN: usize = 100;

/// Ids of every object referenced through an `/SMask` entry.
pub fn find_smask_ids(buf: &[u8]) -> Vec<u32> {
    let mut ids: Vec<u32> = engine::find_objects(buf)
        .iter()
        .filter_map(|span| SMASK_REF.captures(span.dict(buf)))
        .filter_map(|c| std::str::from_utf8(&c[1]).ok()?.parse().ok())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Recompress every soft-mask stream in place. Returns the number of
/// masks canonicalized; the buffer length never changes.
pub fn canonicalize_smasks(buf: &mut Vec<u8>) -> Result<usize> {
    let ids = find_smask_ids(buf);
    if ids.is_empty() {
        return Ok(0);
    }

    let spans: std::collections::HashMap<u32, engine::ObjectSpan> = engine::find_objects(buf)
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut canonicalized = 0usize;
    for id in ids {
        let span = match spans.get(&id) {
            Some(s) => s,
            None => continue,
        };
        let stream = match span.stream {
            Some(s) => s,
            None => continue,
        };
        let dict = span.dict(buf).to_vec();
        let raw = buf[stream.start..stream.end].to_vec();

        let decoded = match engine::decode_stream(&dict, &raw) {
            Ok(d) => d,
            Err(err) => {
                log::warn!("mask {} not decodable, left untouched: {}", id, err);
                continue;
            }
        };
        if decoded.len() < MIN_DECODED_LEN {
            log::debug!("mask {} too small to canonicalize", id);
            continue;
        }

        let recompressed = engine::encode_stream_flate(&decoded);
        if recompressed.len() > raw.len() {
            log::debug!(
                "mask {} recompresses larger ({} > {}), left untouched",
                id,
                recompressed.len(),
                raw.len()
            );
            continue;
        }

        engine::overwrite_range_padded(buf, stream.start, stream.end, &recompressed, 0x00)?;
        canonicalized += 1;
    }

    Ok(canonicalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defender::{Anchor, InjectContext};
    use crate::payload;

    const KEY: &[u8; 32] = b"kkkkkkkkkkkkkkkkkkkkkkkkkkkkkkkk";

    fn pdf_with_image(width: usize, height: usize) -> Vec<u8> {
        let pixels = vec![0x80u8; width * height];
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
                "4 0 obj\n<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
                width, height, data.len()
            )
            .as_bytes(),
        );
        buf.extend_from_slice(&data);
        buf.extend_from_slice(b"\nendstream\nendobj\n");
        buf.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n%%EOF\n");
        buf
    }

    fn smask_signed() -> Vec<u8> {
        let sealed = payload::encrypt(b"UserID:12345", KEY).unwrap();
        let ctx = InjectContext {
            payload: &sealed,
            message: "UserID:12345",
            style: &crate::config::WatermarkStyle::default(),
            rasterizer: None,
        };
        Anchor::Smask.inject(&pdf_with_image(400, 400), &ctx).unwrap()
    }

    #[test]
    fn test_canonicalize_defeats_smask_extraction() {
        let mut buf = smask_signed();
        assert!(Anchor::Smask.extract(&buf).is_ok());

        let before_len = buf.len();
        let count = canonicalize_smasks(&mut buf).unwrap();
        assert_eq!(count, 1);
        assert_eq!(buf.len(), before_len);
        assert!(Anchor::Smask.extract(&buf).is_err());
    }

    #[test]
    fn test_mask_pixels_survive() {
        let mut buf = smask_signed();
        let id = find_smask_ids(&buf)[0];
        let spans = engine::find_objects(&buf);
        let span = spans.iter().find(|s| s.id == id).unwrap().clone();
        let stream = span.stream.unwrap();
        let before = engine::decode_stream(span.dict(&buf), &buf[stream.start..stream.end]).unwrap();

        canonicalize_smasks(&mut buf).unwrap();

        // The tolerant engine decode still sees identical pixel values
        let spans = engine::find_objects(&buf);
        let span = spans.iter().find(|s| s.id == id).unwrap();
        let stream = span.stream.unwrap();
        let after = engine::decode_stream(span.dict(&buf), &buf[stream.start..stream.end]).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_no_smasks() {
        let mut buf = pdf_with_image(32, 32);
        assert_eq!(canonicalize_smasks(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_find_smask_ids() {
        let buf = smask_signed();
        let ids = find_smask_ids(&buf);
        assert_eq!(ids.len(), 1);
    }
}
