//! Specific-signature stream cleaner.
//!
//! Scans every stream (decoded where possible) for a configured byte
//! signature and wipes matching stream bodies with spaces. Offsets stay
//! valid because the wipe is length-preserving.

use crate::config::ScanConfig;
use crate::engine;

/// Wipe streams whose content carries the configured signature. Returns
/// the number of streams wiped.
pub fn wipe_signature_streams(buf: &mut [u8], config: &ScanConfig) -> usize {
    let mut targets = Vec::new();

    for span in engine::find_objects(buf) {
        let stream = match span.stream {
            Some(s) => s,
            None => continue,
        };
        let raw = &buf[stream.start..stream.end];
        let decoded = engine::decode_stream(span.dict(buf), raw).unwrap_or_else(|_| raw.to_vec());
        if contains(&decoded, &config.signature) || contains(raw, &config.signature) {
            targets.push(stream);
        }
    }

    for stream in &targets {
        engine::wipe_range(buf, stream.start, stream.end);
    }
    targets.len()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}
