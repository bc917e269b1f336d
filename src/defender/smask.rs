//! SMask anchor: image soft-mask steganography.
//!
//! Injection attaches an all-opaque grayscale `/SMask` to the first image
//! XObject and hides `MAGIC || payload` in the tail of the decoded mask
//! bytes. The mask is a legitimate soft mask, so the file stays
//! standards-compliant; the cost is that a cleaner which recompresses
//! mask streams destroys the channel, which the defender accepts.
//!
//! Capacity: the framed payload must fit inside the final 500 decoded
//! mask bytes (the extractor's scan window) and leave at least 100 bytes
//! of slack, so the host image needs `W*H >= payload + 4 + 100`.

use std::io::Read;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::engine::{self, ObjectSpan};
use crate::error::{Error, Result};
use crate::payload::MAGIC;
use crate::rewrite::{insert_into_dict, PdfRewriter};

/// Extractor scan window over the decoded mask tail.
const SCAN_WINDOW: usize = 500;

/// Minimum slack between the mask start and the framed payload.
const MIN_SLACK: usize = 100;

lazy_static! {
    static ref IMAGE_XOBJECT: Regex =
        Regex::new(r"/Type[ \t\r\n]*/XObject[\s\S]*?/Subtype[ \t\r\n]*/Image|/Subtype[ \t\r\n]*/Image[\s\S]*?/Type[ \t\r\n]*/XObject")
            .unwrap();
    static ref WIDTH: Regex = Regex::new(r"/Width[ \t\r\n]+(\d+)").unwrap();
    static ref HEIGHT: Regex = Regex::new(r"/Height[ \t\r\n]+(\d+)").unwrap();
    static ref SMASK_REF: Regex =
        Regex::new(r"/SMask[ \t\r\n]+(\d+)[ \t\r\n]+(\d+)[ \t\r\n]+R").unwrap();
}

/// Dimensions of an image XObject dictionary.
fn dimensions(dict: &[u8]) -> Option<(usize, usize)> {
    let w = WIDTH.captures(dict)?;
    let h = HEIGHT.captures(dict)?;
    let w: usize = std::str::from_utf8(&w[1]).ok()?.parse().ok()?;
    let h: usize = std::str::from_utf8(&h[1]).ok()?.parse().ok()?;
    Some((w, h))
}

fn image_spans(buf: &[u8]) -> Vec<ObjectSpan> {
    engine::find_objects(buf)
        .into_iter()
        .filter(|span| span.stream.is_some() && IMAGE_XOBJECT.is_match(span.dict(buf)))
        .collect()
}

/// Whether some image can host the framed payload.
pub fn is_available(buf: &[u8], payload_len: usize) -> bool {
    let needed = payload_len + MAGIC.len() + MIN_SLACK;
    image_spans(buf)
        .iter()
        .filter_map(|span| dimensions(span.dict(buf)))
        .any(|(w, h)| w * h >= needed)
}

/// Hide the payload in a fresh soft mask on the first suitable image.
pub fn inject(buf: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let images = image_spans(buf);
    let first = images.first().ok_or(Error::NoSuitableImage)?;
    let (width, height) = dimensions(first.dict(buf)).ok_or(Error::NoSuitableImage)?;
    let host_id = first.id;

    let mut framed = Vec::with_capacity(MAGIC.len() + payload.len());
    framed.extend_from_slice(&MAGIC);
    framed.extend_from_slice(payload);

    let mask_size = width * height;
    if mask_size < framed.len() + MIN_SLACK {
        return Err(Error::ImageTooSmall {
            needed: framed.len() + MIN_SLACK,
            have: mask_size,
        });
    }

    let mut mask = vec![0xFFu8; mask_size];
    let offset = mask_size - framed.len();
    mask[offset..].copy_from_slice(&framed);

    // Fast compression keeps large-mask injection cheap; it also leaves
    // headroom for downstream recompression to shrink the stream.
    let encoded = encode_fast(&mask);

    let mut rewriter = PdfRewriter::parse(buf)?;
    let mask_id = rewriter.add_stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
            width, height
        ),
        &encoded,
    );

    let host_body = rewriter
        .body(host_id)
        .ok_or(Error::NoSuitableImage)?
        .to_vec();
    let entry = format!("/SMask {} 0 R", mask_id);
    let updated = if let Some(m) = SMASK_REF.find(&host_body) {
        let mut out = host_body[..m.start()].to_vec();
        out.extend_from_slice(entry.as_bytes());
        out.extend_from_slice(&host_body[m.end()..]);
        out
    } else {
        insert_into_dict(&host_body, &entry)
            .ok_or_else(|| Error::InvalidPdf("image object has no dictionary".into()))?
    };
    rewriter.set_body(host_id, updated);

    Ok(rewriter.serialize())
}

/// Recover the payload from any image's soft mask.
pub fn extract(buf: &[u8]) -> Result<Vec<u8>> {
    let objects: std::collections::HashMap<u32, ObjectSpan> = engine::find_objects(buf)
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    for span in image_spans(buf) {
        let smask_ref = match SMASK_REF.captures(span.dict(buf)) {
            Some(c) => c,
            None => continue,
        };
        let mask_id: u32 = match std::str::from_utf8(&smask_ref[1])
            .ok()
            .and_then(|s| s.parse().ok())
        {
            Some(id) => id,
            None => continue,
        };
        let mask_obj = match objects.get(&mask_id) {
            Some(o) => o,
            None => continue,
        };
        let stream = match mask_obj.stream {
            Some(s) => s,
            None => continue,
        };
        let mask = match decode_mask(mask_obj.dict(buf), &buf[stream.start..stream.end]) {
            Ok(m) => m,
            Err(err) => {
                log::debug!("soft mask {} not decodable: {}", mask_id, err);
                continue;
            }
        };
        if let Some(payload) = payload_in_tail(&mask) {
            return Ok(payload);
        }
    }

    Err(Error::NoPayloadFound)
}

/// Decode a mask stream, requiring the zlib stream to account for the
/// whole region. Trailing foreign bytes mean the mask was rewritten by
/// someone else and the tail can no longer be trusted.
fn decode_mask(dict: &[u8], raw: &[u8]) -> Result<Vec<u8>> {
    if !dict.windows(12).any(|w| w == b"/FlateDecode") {
        return Ok(raw.to_vec());
    }
    let mut decoder = ZlibDecoder::new(raw);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Decode(format!("mask inflate failed: {}", e)))?;
    if (decoder.total_in() as usize) < raw.len() {
        return Err(Error::Decode(format!(
            "{} trailing bytes after mask stream",
            raw.len() - decoder.total_in() as usize
        )));
    }
    Ok(out)
}

/// Scan the final bytes of the decoded mask for the magic header and
/// return everything after it.
fn payload_in_tail(mask: &[u8]) -> Option<Vec<u8>> {
    let window = SCAN_WINDOW.min(mask.len());
    let scan_start = mask.len() - window;
    let scan = &mask[scan_start..];
    let at = scan.windows(MAGIC.len()).position(|w| w == MAGIC)?;
    Some(mask[scan_start + at + MAGIC.len()..].to_vec())
}

fn encode_fast(data: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data).expect("in-memory deflate");
    encoder.finish().expect("in-memory deflate")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::encode_stream_flate;

    fn pdf_with_image(width: usize, height: usize) -> Vec<u8> {
        let pixels = vec![0x80u8; width * height];
        let data = encode_stream_flate(&pixels);
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

    #[test]
    fn test_inject_then_extract() {
        let payload = b"\xCA\xFE\xBA\xBEsealed-payload".to_vec();
        let signed = inject(&pdf_with_image(64, 64), &payload).unwrap();
        assert_eq!(extract(&signed).unwrap(), payload);
    }

    #[test]
    fn test_availability_tracks_area() {
        let payload_len = 44;
        assert!(is_available(&pdf_with_image(64, 64), payload_len));
        assert!(!is_available(&pdf_with_image(4, 4), payload_len));
        assert!(!is_available(b"%PDF-1.4\n%%EOF\n", payload_len));
    }

    #[test]
    fn test_capacity_boundary() {
        let payload = vec![0xAB; 60];
        let needed = payload.len() + MAGIC.len() + MIN_SLACK;
        // Exactly at capacity succeeds
        let buf = pdf_with_image(needed, 1);
        assert!(inject(&buf, &payload).is_ok());
        // One byte short fails
        let buf = pdf_with_image(needed - 1, 1);
        assert!(matches!(
            inject(&buf, &payload),
            Err(Error::ImageTooSmall { .. })
        ));
    }

    #[test]
    fn test_no_image() {
        let buf = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer << /Root 1 0 R >>\n%%EOF\n";
        assert!(matches!(inject(buf, b"p"), Err(Error::NoSuitableImage)));
    }

    #[test]
    fn test_extract_rejects_trailing_garbage() {
        let payload = b"\xCA\xFE\xBA\xBEsealed".to_vec();
        let signed = inject(&pdf_with_image(64, 64), &payload).unwrap();
        assert!(extract(&signed).is_ok());
        // Zero-pad the mask stream the way a canonicalizer would: bytes
        // after the zlib stream must make the extractor distrust the tail
        let spans = engine::find_objects(&signed);
        let mask = spans
            .iter()
            .filter(|s| s.stream.is_some() && IMAGE_XOBJECT.is_match(s.dict(&signed)))
            .find(|s| SMASK_REF.captures(s.dict(&signed)).is_none())
            .cloned()
            .unwrap();
        let stream = mask.stream.unwrap();
        let mut padded = signed[..stream.end].to_vec();
        padded.extend_from_slice(&[0u8; 8]);
        padded.extend_from_slice(&signed[stream.end..]);
        assert!(matches!(extract(&padded), Err(Error::NoPayloadFound)));
    }
}
