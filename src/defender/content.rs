//! Content anchor: invisible-text perturbation of page content streams.
//!
//! Each page gains an extra content stream of the form
//!
//! ```text
//! q BT /PhantomHelv 1 Tf 3 Tr [ ( ) 202 ( ) 254 ... ] TJ ET Q
//! ```
//!
//! `3 Tr` selects text render mode "invisible", and the integers are the
//! framed payload bytes smuggled as TJ kerning values. Only standard text
//! operators appear, so structural cleaners that preserve rendering keep
//! the block alive.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::engine;
use crate::error::{Error, Result};
use crate::payload::MAGIC;
use crate::rewrite::{insert_into_dict, PdfRewriter};

use super::resources::add_page_resource;

/// Logical name of the phantom font resource.
pub const FONT_NAME: &str = "PhantomHelv";

lazy_static! {
    static ref PAGE_TYPE: Regex = Regex::new(r"/Type[ \t\r\n]*/Page\b").unwrap();
    static ref CONTENTS_REF: Regex =
        Regex::new(r"/Contents[ \t\r\n]+(\d+)[ \t\r\n]+(\d+)[ \t\r\n]+R").unwrap();
    static ref CONTENTS_ARRAY: Regex = Regex::new(r"/Contents[ \t\r\n]*\[").unwrap();
}

/// Page object ids in id order.
fn page_ids(rewriter: &PdfRewriter) -> Vec<u32> {
    rewriter
        .ids()
        .filter(|&id| {
            rewriter
                .body(id)
                .map(|b| PAGE_TYPE.is_match(b))
                .unwrap_or(false)
        })
        .collect()
}

/// Append the invisible-text block to every page.
pub fn inject(buf: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let mut rewriter = PdfRewriter::parse(buf)?;
    let pages = page_ids(&rewriter);
    if pages.is_empty() {
        return Err(Error::NoContentStream);
    }

    let font_id = rewriter.add(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());

    let block = marker_block(payload);
    let encoded = engine::encode_stream_flate(&block);

    for page_id in pages {
        let stream_id = rewriter.add_stream("/Filter /FlateDecode", &encoded);
        append_content(&mut rewriter, page_id, stream_id)?;
        add_page_resource(&mut rewriter, page_id, "Font", FONT_NAME, font_id)?;
    }

    Ok(rewriter.serialize())
}

/// The raw invisible-text content block for a payload.
fn marker_block(payload: &[u8]) -> Vec<u8> {
    let mut tokens = String::new();
    for &b in MAGIC.iter().chain(payload.iter()) {
        tokens.push_str(&format!("( ) {} ", b));
    }
    format!("q\nBT\n/{} 1 Tf\n3 Tr\n[ {}] TJ\nET\nQ\n", FONT_NAME, tokens).into_bytes()
}

/// Attach `stream_id` to the page's `/Contents`, preserving the original
/// streams. Also used by the visual anchor's overlays.
pub(crate) fn append_content(rewriter: &mut PdfRewriter, page_id: u32, stream_id: u32) -> Result<()> {
    let body = rewriter
        .body(page_id)
        .ok_or_else(|| Error::InvalidPdf(format!("page object {} missing", page_id)))?
        .to_vec();

    let updated = if let Some(m) = CONTENTS_ARRAY.find(&body) {
        // Existing array: append before the closing bracket
        let open = m.end() - 1;
        let close = body[open..]
            .iter()
            .position(|&b| b == b']')
            .map(|i| open + i)
            .ok_or_else(|| Error::InvalidPdf("unterminated /Contents array".into()))?;
        let mut out = body[..close].to_vec();
        out.extend_from_slice(format!(" {} 0 R ", stream_id).as_bytes());
        out.extend_from_slice(&body[close..]);
        out
    } else if let Some(m) = CONTENTS_REF.captures(&body) {
        // Single stream: promote to an array of two
        let whole = m.get(0).unwrap();
        let old_id = String::from_utf8_lossy(&m[1]).to_string();
        let old_gen = String::from_utf8_lossy(&m[2]).to_string();
        let mut out = body[..whole.start()].to_vec();
        out.extend_from_slice(
            format!("/Contents [{} {} R {} 0 R]", old_id, old_gen, stream_id).as_bytes(),
        );
        out.extend_from_slice(&body[whole.end()..]);
        out
    } else {
        insert_into_dict(&body, &format!("/Contents [{} 0 R]", stream_id))
            .ok_or_else(|| Error::InvalidPdf("page object has no dictionary".into()))?
    };

    rewriter.set_body(page_id, updated);
    Ok(())
}

/// Recover the payload from any content stream's invisible-text block.
pub fn extract(buf: &[u8]) -> Result<Vec<u8>> {
    for span in engine::find_objects(buf) {
        let stream = match span.stream {
            Some(s) => s,
            None => continue,
        };
        let decoded = match engine::decode_stream(span.dict(buf), &buf[stream.start..stream.end]) {
            Ok(d) => d,
            Err(_) => continue,
        };
        if let Some(payload) = payload_from_stream(&decoded) {
            return Ok(payload);
        }
    }
    Err(Error::NoPayloadFound)
}

/// Parse the first `3 Tr … [ … ] TJ` block into payload bytes.
fn payload_from_stream(decoded: &[u8]) -> Option<Vec<u8>> {
    let tr = find_sub(decoded, b"3 Tr")?;
    let after = &decoded[tr + 4..];
    let open = after.iter().position(|&b| b == b'[')?;
    let close = after[open..].iter().position(|&b| b == b']')? + open;
    let tj_follows = after[close + 1..]
        .iter()
        .skip_while(|&&b| engine::is_pdf_whitespace(b))
        .take(2)
        .copied()
        .collect::<Vec<u8>>();
    if tj_follows != b"TJ" {
        return None;
    }

    let mut bytes = Vec::new();
    let interior = &after[open + 1..close];
    for token in interior
        .split(|&b| engine::is_pdf_whitespace(b))
        .filter(|t| !t.is_empty())
    {
        match token {
            b"(" | b")" | b"()" => continue,
            _ => {
                let text = std::str::from_utf8(token).ok()?;
                let value: i64 = text.parse().ok()?;
                if !(0..=255).contains(&value) {
                    return None;
                }
                bytes.push(value as u8);
            }
        }
    }

    let at = bytes.windows(MAGIC.len()).position(|w| w == MAGIC)?;
    Some(bytes[at + MAGIC.len()..].to_vec())
}

fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
