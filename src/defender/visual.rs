//! Visual anchor: overt diagonal watermark on every page.
//!
//! Deterrence only; there is no extraction channel. ASCII messages are
//! drawn with Helvetica text operators directly in an overlay content
//! stream. Non-ASCII messages go through an external [`TextRasterizer`]
//! that produces a transparent PNG at 72 DPI (one pixel per point), which
//! is embedded as an image XObject with an alpha soft mask.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::config::WatermarkStyle;
use crate::engine;
use crate::error::{Error, Result};
use crate::rewrite::PdfRewriter;

use super::resources::add_page_resource;

/// External text renderer contract.
///
/// Given a message and a point size, produce a PNG with a transparent
/// background and grey glyphs, rendered at 72 DPI so that one pixel equals
/// one PDF point.
pub trait TextRasterizer {
    /// Render `text` at `point_size` into PNG bytes.
    fn render(&self, text: &str, point_size: f32) -> Result<Vec<u8>>;
}

lazy_static! {
    static ref PAGE_TYPE: Regex = Regex::new(r"/Type[ \t\r\n]*/Page\b").unwrap();
    static ref MEDIA_BOX: Regex = Regex::new(
        r"/MediaBox[ \t\r\n]*\[[ \t\r\n]*([\d.+-]+)[ \t\r\n]+([\d.+-]+)[ \t\r\n]+([\d.+-]+)[ \t\r\n]+([\d.+-]+)"
    )
    .unwrap();
    static ref FONT_REGISTRY: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Register a TTF for watermark rendering under the process-wide logical
/// name. Idempotent: the first installed font wins.
pub fn install_font(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::InvalidInput(format!(
            "font file does not exist: {}",
            path.display()
        )));
    }
    let mut registry = FONT_REGISTRY.lock().expect("font registry lock");
    if registry.is_none() {
        *registry = Some(path.to_path_buf());
    }
    Ok(())
}

/// Path of the installed watermark font, if any.
pub fn installed_font() -> Option<PathBuf> {
    FONT_REGISTRY.lock().expect("font registry lock").clone()
}

/// Overlay the plaintext message on every page.
pub fn inject(
    buf: &[u8],
    message: &str,
    style: &WatermarkStyle,
    rasterizer: Option<&dyn TextRasterizer>,
) -> Result<Vec<u8>> {
    let mut rewriter = PdfRewriter::parse(buf)?;
    let pages: Vec<u32> = rewriter
        .ids()
        .filter(|&id| {
            rewriter
                .body(id)
                .map(|b| PAGE_TYPE.is_match(b))
                .unwrap_or(false)
        })
        .collect();
    if pages.is_empty() {
        return Err(Error::NoContentStream);
    }

    let gs_id = rewriter.add(
        format!(
            "<< /Type /ExtGState /ca {op} /CA {op} >>",
            op = style.opacity
        )
        .into_bytes(),
    );

    if message.is_ascii() {
        inject_text(&mut rewriter, &pages, message, style, gs_id)?;
    } else {
        let rasterizer = rasterizer.ok_or_else(|| {
            Error::InvalidInput("non-ASCII watermark text requires a rasterizer".into())
        })?;
        inject_raster(&mut rewriter, &pages, message, style, gs_id, rasterizer)?;
    }

    Ok(rewriter.serialize())
}

/// Helvetica text overlay for ASCII messages.
fn inject_text(
    rewriter: &mut PdfRewriter,
    pages: &[u32],
    message: &str,
    style: &WatermarkStyle,
    gs_id: u32,
) -> Result<()> {
    let font_id = rewriter.add(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
    let (sin, cos) = style.rotation.to_radians().sin_cos();

    for &page_id in pages {
        let (width, height) = page_size(rewriter.body(page_id).unwrap_or(b""));
        let (cx, cy) = (width / 2.0, height / 2.0);
        // Walk the baseline back so the text straddles the page center
        let half = estimate_text_width(message, style.font_size) / 2.0;
        let tx = cx - half * cos;
        let ty = cy - half * sin;

        let overlay = format!(
            "q\n/GSwm gs\n{g} g\nBT\n/WmHelv {size} Tf\n{lead} TL\n{cos:.4} {sin:.4} {nsin:.4} {cos:.4} {tx:.2} {ty:.2} Tm\n(CONFIDENTIAL) Tj\nT*\n({msg}) Tj\nET\nQ\n",
            g = style.grey,
            size = style.font_size,
            lead = style.font_size * 1.25,
            cos = cos,
            sin = sin,
            nsin = -sin,
            tx = tx,
            ty = ty,
            msg = escape_pdf_string(message),
        );
        let encoded = engine::encode_stream_flate(overlay.as_bytes());
        let stream_id = rewriter.add_stream("/Filter /FlateDecode", &encoded);
        append_contents(rewriter, page_id, stream_id)?;
        add_page_resource(rewriter, page_id, "ExtGState", "GSwm", gs_id)?;
        add_page_resource(rewriter, page_id, "Font", "WmHelv", font_id)?;
    }
    Ok(())
}

/// Rasterized image overlay for non-ASCII messages.
fn inject_raster(
    rewriter: &mut PdfRewriter,
    pages: &[u32],
    message: &str,
    style: &WatermarkStyle,
    gs_id: u32,
    rasterizer: &dyn TextRasterizer,
) -> Result<()> {
    let size = adaptive_point_size(message, style);
    let png = rasterizer.render(message, size)?;
    let decoded = image::load_from_memory(&png)
        .map_err(|e| Error::Decode(format!("watermark PNG: {}", e)))?
        .to_rgba8();
    let (px_w, px_h) = decoded.dimensions();

    let mut rgb = Vec::with_capacity((px_w * px_h * 3) as usize);
    let mut alpha = Vec::with_capacity((px_w * px_h) as usize);
    for pixel in decoded.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let alpha_id = rewriter.add_stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
            px_w, px_h
        ),
        &engine::encode_stream_flate(&alpha),
    );
    let image_id = rewriter.add_stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /SMask {} 0 R",
            px_w, px_h, alpha_id
        ),
        &engine::encode_stream_flate(&rgb),
    );

    let (sin, cos) = style.rotation.to_radians().sin_cos();
    let (w, h) = (px_w as f32, px_h as f32);

    for &page_id in pages {
        let (page_w, page_h) = page_size(rewriter.body(page_id).unwrap_or(b""));
        let (cx, cy) = (page_w / 2.0, page_h / 2.0);
        // Rotate the unit square about its center, then translate to the
        // page center (one pixel = one point at 72 DPI)
        let tx = cx - (w * cos - h * sin) / 2.0;
        let ty = cy - (w * sin + h * cos) / 2.0;
        let overlay = format!(
            "q\n/GSwm gs\n{a:.4} {b:.4} {c:.4} {d:.4} {tx:.2} {ty:.2} cm\n/WmImg Do\nQ\n",
            a = w * cos,
            b = w * sin,
            c = -h * sin,
            d = h * cos,
            tx = tx,
            ty = ty,
        );
        let encoded = engine::encode_stream_flate(overlay.as_bytes());
        let stream_id = rewriter.add_stream("/Filter /FlateDecode", &encoded);
        append_contents(rewriter, page_id, stream_id)?;
        add_page_resource(rewriter, page_id, "ExtGState", "GSwm", gs_id)?;
        add_page_resource(rewriter, page_id, "XObject", "WmImg", image_id)?;
    }
    Ok(())
}

/// Shrink the point size until the estimated line width fits the style's
/// maximum.
fn adaptive_point_size(message: &str, style: &WatermarkStyle) -> f32 {
    let mut size = style.font_size;
    while size > 8.0 && estimate_text_width(message, size) > style.max_width {
        size -= 4.0;
    }
    size
}

/// Crude Helvetica-average width estimate: 0.6 em per character.
fn estimate_text_width(text: &str, point_size: f32) -> f32 {
    text.chars().count() as f32 * point_size * 0.6
}

fn page_size(body: &[u8]) -> (f32, f32) {
    if let Some(m) = MEDIA_BOX.captures(body) {
        let parse = |i: usize| -> Option<f32> { std::str::from_utf8(&m[i]).ok()?.parse().ok() };
        if let (Some(x0), Some(y0), Some(x1), Some(y1)) = (parse(1), parse(2), parse(3), parse(4)) {
            return (x1 - x0, y1 - y0);
        }
    }
    // US Letter
    (612.0, 792.0)
}

fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            _ => out.push(c),
        }
    }
    out
}

fn append_contents(rewriter: &mut PdfRewriter, page_id: u32, stream_id: u32) -> Result<()> {
    // The content anchor already knows how to splice /Contents
    super::content::append_content(rewriter, page_id, stream_id)
}
