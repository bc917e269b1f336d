//! Anchor dispatch.
//!
//! The four embedding strategies form a closed set, so they are a plain
//! enum rather than trait objects; the registry is an ordered slice and
//! the order defines verification priority.

use std::fs;
use std::path::Path;

use crate::config::WatermarkStyle;
use crate::error::Result;

use super::visual::TextRasterizer;
use super::{attachment, content, smask, visual};

/// A named embedding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Overt embedded file (`font_license.txt`)
    Attachment,
    /// Steganographic image soft-mask tail
    Smask,
    /// Invisible-text content-stream block
    Content,
    /// Overt visual watermark (inject-only)
    Visual,
}

/// Everything an anchor may need during injection.
///
/// Extracting anchors carry the sealed payload; the visual anchor renders
/// the plaintext message instead.
pub struct InjectContext<'a> {
    /// Sealed payload (`MAGIC || nonce || ciphertext`)
    pub payload: &'a [u8],
    /// Plaintext message, for the visual overlay
    pub message: &'a str,
    /// Visual overlay style constants
    pub style: &'a WatermarkStyle,
    /// External renderer for non-ASCII watermark text
    pub rasterizer: Option<&'a dyn TextRasterizer>,
}

impl Anchor {
    /// Default injection order.
    pub const DEFAULT_ORDER: [Anchor; 4] = [
        Anchor::Attachment,
        Anchor::Smask,
        Anchor::Content,
        Anchor::Visual,
    ];

    /// Extraction order used by the verifier.
    pub const EXTRACTING: [Anchor; 3] = [Anchor::Attachment, Anchor::Smask, Anchor::Content];

    /// Anchor name as shown to the driver.
    pub fn name(&self) -> &'static str {
        match self {
            Anchor::Attachment => "Attachment",
            Anchor::Smask => "SMask",
            Anchor::Content => "Content",
            Anchor::Visual => "Visual",
        }
    }

    /// Parse a driver-facing anchor name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "attachment" => Some(Anchor::Attachment),
            "smask" => Some(Anchor::Smask),
            "content" => Some(Anchor::Content),
            "visual" => Some(Anchor::Visual),
            _ => None,
        }
    }

    /// Whether this anchor can embed into the given buffer.
    pub fn is_available(&self, buf: &[u8], payload_len: usize) -> bool {
        match self {
            Anchor::Attachment => true,
            Anchor::Smask => smask::is_available(buf, payload_len),
            Anchor::Content | Anchor::Visual => crate::engine::count_pages(buf) >= 1,
        }
    }

    /// Embed into a buffer, returning the new file bytes.
    pub fn inject(&self, buf: &[u8], ctx: &InjectContext<'_>) -> Result<Vec<u8>> {
        match self {
            Anchor::Attachment => attachment::inject(buf, ctx.payload),
            Anchor::Smask => smask::inject(buf, ctx.payload),
            Anchor::Content => content::inject(buf, ctx.payload),
            Anchor::Visual => visual::inject(buf, ctx.message, ctx.style, ctx.rasterizer),
        }
    }

    /// Embed from one file into another.
    pub fn inject_file(&self, input: &Path, output: &Path, ctx: &InjectContext<'_>) -> Result<()> {
        let buf = fs::read(input)?;
        let out = self.inject(&buf, ctx)?;
        fs::write(output, out)?;
        Ok(())
    }

    /// Recover the sealed payload from a buffer.
    pub fn extract(&self, buf: &[u8]) -> Result<Vec<u8>> {
        match self {
            Anchor::Attachment => attachment::extract(buf),
            Anchor::Smask => smask::extract(buf),
            Anchor::Content => content::extract(buf),
            Anchor::Visual => Err(crate::error::Error::VisualNotExtractable),
        }
    }
}
