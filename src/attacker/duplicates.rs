//! High-frequency duplicate-stream detection and wiping.
//!
//! A per-page watermark shows up as N stream objects with different ids
//! but identical decoded bytes. Streams are fingerprinted by SHA-256 of
//! their decoded content; a hash repeated at least
//! `max(2, floor(threshold * pages))` times is flagged and every copy is
//! wiped with spaces, leaving the file length unchanged.

use std::collections::HashMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::ScanConfig;
use crate::engine;

/// A stream hash that crossed the repeat threshold.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedHash {
    /// Hex digest of the decoded stream bytes
    pub hash: String,
    /// Number of stream objects sharing it
    pub count: usize,
}

/// Duplicate-stream scan result.
#[derive(Debug, Serialize)]
pub struct DuplicateScan {
    /// Pages counted (floored at 1)
    pub pages: usize,
    /// Repeat count a hash must reach
    pub min_count: usize,
    /// Hashes over the threshold
    pub flagged: Vec<FlaggedHash>,
}

struct HashedStream {
    hash: [u8; 32],
    start: usize,
    end: usize,
}

fn hash_streams(buf: &[u8], config: &ScanConfig) -> Vec<HashedStream> {
    let mut streams = Vec::new();
    for span in engine::find_objects(buf) {
        let stream = match span.stream {
            Some(s) => s,
            None => continue,
        };
        let raw = &buf[stream.start..stream.end];
        // Hash decoded bytes so re-compression cannot hide a duplicate
        let decoded = engine::decode_stream(span.dict(buf), raw).unwrap_or_else(|_| raw.to_vec());
        if decoded.len() < config.min_stream_len {
            continue;
        }
        let mut hasher = Sha256::new();
        hasher.update(&decoded);
        streams.push(HashedStream {
            hash: hasher.finalize().into(),
            start: stream.start,
            end: stream.end,
        });
    }
    streams
}

fn threshold_count(buf: &[u8], config: &ScanConfig) -> (usize, usize) {
    let pages = engine::count_pages(buf).max(1);
    let min_count = ((pages as f64 * config.duplicate_threshold).floor() as usize).max(2);
    (pages, min_count)
}

/// Report hashes repeated at or above the configured threshold.
pub fn scan_duplicates(buf: &[u8], config: &ScanConfig) -> DuplicateScan {
    let (pages, min_count) = threshold_count(buf, config);
    let streams = hash_streams(buf, config);

    let mut counts: HashMap<[u8; 32], usize> = HashMap::new();
    for s in &streams {
        *counts.entry(s.hash).or_insert(0) += 1;
    }

    let mut flagged: Vec<FlaggedHash> = counts
        .into_iter()
        .filter(|&(_, count)| count >= min_count)
        .map(|(hash, count)| FlaggedHash {
            hash: hash.iter().map(|b| format!("{:02x}", b)).collect(),
            count,
        })
        .collect();
    flagged.sort_by(|a, b| a.hash.cmp(&b.hash));

    DuplicateScan {
        pages,
        min_count,
        flagged,
    }
}

/// Wipe every stream whose decoded hash crossed the threshold. Returns
/// the number of streams wiped; the buffer length never changes.
pub fn wipe_duplicates(buf: &mut [u8], config: &ScanConfig) -> usize {
    let (pages, min_count) = threshold_count(buf, config);
    let streams = hash_streams(buf, config);

    let mut counts: HashMap<[u8; 32], usize> = HashMap::new();
    for s in &streams {
        *counts.entry(s.hash).or_insert(0) += 1;
    }

    let mut wiped = 0usize;
    for s in &streams {
        if counts[&s.hash] >= min_count {
            engine::wipe_range(buf, s.start, s.end);
            wiped += 1;
        }
    }
    if wiped > 0 {
        log::info!(
            "wiped {} duplicated streams ({} pages, threshold {})",
            wiped,
            pages,
            min_count
        );
    }
    wiped
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a PDF with `pages` pages and `copies` objects carrying the
    /// same decoded stream bytes.
    fn pdf_with_duplicates(pages: usize, copies: usize) -> Vec<u8> {
        let content = engine::encode_stream_flate(
            b"q 0.5 g BT /F1 48 Tf 100 400 Td (TRACKED DOCUMENT) Tj ET Q",
        );
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 10 + i)).collect();
        buf.extend_from_slice(
            format!(
                "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
                kids.join(" "),
                pages
            )
            .as_bytes(),
        );
        for i in 0..pages {
            buf.extend_from_slice(
                format!("{} 0 obj\n<< /Type /Page /Parent 2 0 R >>\nendobj\n", 10 + i).as_bytes(),
            );
        }
        for i in 0..copies {
            buf.extend_from_slice(
                format!(
                    "{} 0 obj\n<< /Filter /FlateDecode /Length {} >>\nstream\n",
                    100 + i,
                    content.len()
                )
                .as_bytes(),
            );
            buf.extend_from_slice(&content);
            buf.extend_from_slice(b"\nendstream\nendobj\n");
        }
        buf.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n%%EOF\n");
        buf
    }

    #[test]
    fn test_threshold_boundary_at_ten_pages() {
        let config = ScanConfig::new();
        // 10 pages, threshold 0.8: 8 copies flagged, 7 are not
        let flagged = scan_duplicates(&pdf_with_duplicates(10, 8), &config);
        assert_eq!(flagged.min_count, 8);
        assert_eq!(flagged.flagged.len(), 1);
        assert_eq!(flagged.flagged[0].count, 8);

        let not_flagged = scan_duplicates(&pdf_with_duplicates(10, 7), &config);
        assert!(not_flagged.flagged.is_empty());
    }

    #[test]
    fn test_floor_of_two() {
        let config = ScanConfig::new();
        // 1 page: floor(0.8) = 0, clamped to 2
        let scan = scan_duplicates(&pdf_with_duplicates(1, 2), &config);
        assert_eq!(scan.min_count, 2);
        assert_eq!(scan.flagged.len(), 1);
    }

    #[test]
    fn test_wipe_preserves_length_and_neutralizes() {
        let config = ScanConfig::new();
        let mut buf = pdf_with_duplicates(10, 10);
        let before_len = buf.len();
        let wiped = wipe_duplicates(&mut buf, &config);
        assert_eq!(wiped, 10);
        assert_eq!(buf.len(), before_len);
        // The compressed watermark bytes are gone from every object
        let watermark = engine::encode_stream_flate(
            b"q 0.5 g BT /F1 48 Tf 100 400 Td (TRACKED DOCUMENT) Tj ET Q",
        );
        assert!(!buf
            .windows(watermark.len())
            .any(|w| w == watermark.as_slice()));
    }

    #[test]
    fn test_small_streams_ignored() {
        let config = ScanConfig::new();
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        for i in 0..5 {
            buf.extend_from_slice(
                format!("{} 0 obj\n<< /Length 5 >>\nstream\ntiny!\nendstream\nendobj\n", 10 + i)
                    .as_bytes(),
            );
        }
        buf.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n%%EOF\n");
        assert!(scan_duplicates(&buf, &config).flagged.is_empty());
    }
}
