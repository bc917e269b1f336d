//! Multi-anchor verification.
//!
//! Anchors are tried in registry order; the first payload the key can
//! open wins. Extraction failures (a stripped anchor) and decryption
//! failures (a replaced payload) are both recovered silently; only total
//! failure across every anchor surfaces.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::payload;

use super::anchor::Anchor;

/// A successfully verified watermark.
#[derive(Debug, PartialEq, Eq)]
pub struct Verified {
    /// Recovered plaintext message
    pub message: String,
    /// Name of the anchor that yielded it
    pub anchor: &'static str,
}

/// Verify a signed file, trying `anchors` (or all extracting anchors) in
/// order.
pub fn verify(path: &Path, key: &[u8], anchors: Option<&[Anchor]>) -> Result<Verified> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidInput("file path cannot be empty".into()));
    }
    payload::check_key(key)?;
    if !path.exists() {
        return Err(Error::InvalidInput(format!(
            "file does not exist: {}",
            path.display()
        )));
    }

    let buf = fs::read(path)?;
    verify_bytes(&buf, key, anchors)
}

/// Buffer-level verification.
pub fn verify_bytes(buf: &[u8], key: &[u8], anchors: Option<&[Anchor]>) -> Result<Verified> {
    payload::check_key(key)?;

    let selected: Vec<Anchor> = match anchors {
        Some(subset) => Anchor::EXTRACTING
            .iter()
            .copied()
            .filter(|a| subset.contains(a))
            .collect(),
        None => Anchor::EXTRACTING.to_vec(),
    };

    for anchor in selected {
        let sealed = match anchor.extract(buf) {
            Ok(p) if !p.is_empty() => p,
            Ok(_) => {
                log::debug!("anchor {}: empty payload", anchor.name());
                continue;
            }
            Err(err) => {
                log::debug!("anchor {}: extraction failed: {}", anchor.name(), err);
                continue;
            }
        };
        match payload::decrypt(&sealed, key) {
            Ok(message) => match String::from_utf8(message) {
                Ok(message) => {
                    log::info!("verified via anchor {}", anchor.name());
                    return Ok(Verified {
                        message,
                        anchor: anchor.name(),
                    });
                }
                Err(_) => {
                    log::debug!("anchor {}: payload is not UTF-8", anchor.name());
                    continue;
                }
            },
            Err(err) => {
                log::debug!("anchor {}: decryption failed: {}", anchor.name(), err);
                continue;
            }
        }
    }

    Err(Error::VerificationFailed)
}
