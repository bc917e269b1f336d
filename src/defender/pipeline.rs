//! Multi-anchor signing pipeline.
//!
//! Anchors run in sequence, each consuming the previous anchor's output.
//! A failing anchor is logged and skipped; the pipeline only fails when
//! no anchor succeeded. Intermediate files alternate between two scratch
//! paths inside a per-operation temporary directory that is removed on
//! every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::WatermarkStyle;
use crate::error::{Error, Result};
use crate::naming::suffixed_path;
use crate::payload;

use super::anchor::{Anchor, InjectContext};
use super::visual::TextRasterizer;

/// Result of a successful signing run.
#[derive(Debug)]
pub struct SignOutcome {
    /// Where the signed file was written
    pub output: PathBuf,
    /// Names of the anchors that embedded successfully, in order
    pub anchors: Vec<&'static str>,
}

/// Sign `input`, writing `<stem>_signed.pdf` next to it.
pub fn sign(
    input: &Path,
    message: &str,
    key: &[u8],
    anchors: &[Anchor],
    rasterizer: Option<&dyn TextRasterizer>,
) -> Result<SignOutcome> {
    let output = suffixed_path(input, "_signed")?;
    sign_to(input, &output, message, key, anchors, rasterizer)
}

/// Sign `input` into an explicit `output` path.
pub fn sign_to(
    input: &Path,
    output: &Path,
    message: &str,
    key: &[u8],
    anchors: &[Anchor],
    rasterizer: Option<&dyn TextRasterizer>,
) -> Result<SignOutcome> {
    validate_sign_inputs(input, message, key)?;
    let anchors = if anchors.is_empty() {
        &Anchor::DEFAULT_ORDER[..]
    } else {
        anchors
    };

    let sealed = payload::encrypt(message.as_bytes(), key)?;
    let style = WatermarkStyle::default();
    let ctx = InjectContext {
        payload: &sealed,
        message,
        style: &style,
        rasterizer,
    };

    let scratch = tempfile::TempDir::new()?;
    let slots = [scratch.path().join("wm0.pdf"), scratch.path().join("wm1.pdf")];

    let mut current: PathBuf = input.to_path_buf();
    let mut succeeded: Vec<&'static str> = Vec::new();

    for anchor in anchors {
        let out = &slots[succeeded.len() % 2];
        match anchor.inject_file(&current, out, &ctx) {
            Ok(()) => {
                log::info!("anchor {} embedded ({} bytes)", anchor.name(), sealed.len());
                succeeded.push(anchor.name());
                current = out.clone();
            }
            Err(err) => {
                log::warn!("anchor {} skipped: {}", anchor.name(), err);
            }
        }
    }

    if succeeded.is_empty() {
        return Err(Error::AllAnchorsFailed);
    }

    fs::copy(&current, output)?;
    // scratch dropped here, removing both slots
    Ok(SignOutcome {
        output: output.to_path_buf(),
        anchors: succeeded,
    })
}

fn validate_sign_inputs(input: &Path, message: &str, key: &[u8]) -> Result<()> {
    if input.as_os_str().is_empty() {
        return Err(Error::InvalidInput("file path cannot be empty".into()));
    }
    if message.is_empty() {
        return Err(Error::InvalidInput("message cannot be empty".into()));
    }
    payload::check_key(key)?;
    if !input.exists() {
        return Err(Error::InvalidInput(format!(
            "file does not exist: {}",
            input.display()
        )));
    }
    let is_pdf = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(Error::InvalidInput(format!(
            "not a PDF file: {}",
            input.display()
        )));
    }
    Ok(())
}
