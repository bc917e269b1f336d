//! Attachment anchor: the sealed payload rides as a standard embedded
//! file named `font_license.txt`.
//!
//! Overt by design. The file-spec carries a conforming `/F`, `/UF`
//! (UTF-16BE) and `/Params` with `/Size` and an MD5 `/CheckSum`, so the
//! attachment looks like any other and survives viewers that rewrite the
//! name tree.

use lazy_static::lazy_static;
use md5::{Digest, Md5};
use regex::bytes::Regex;

use crate::engine;
use crate::error::{Error, Result};
use crate::rewrite::{insert_into_dict, matching_dict_end, subdict_span, PdfRewriter};

/// Deliberately innocuous attachment name.
pub const ATTACH_NAME: &str = "font_license.txt";

lazy_static! {
    static ref NAMES_ARRAY: Regex =
        Regex::new(r"/EmbeddedFiles[ \t\r\n]*<<[ \t\r\n]*/Names[ \t\r\n]*\[([^\]]*)\]").unwrap();
    static ref NAME_PAIR: Regex =
        Regex::new(r"(?:\(([^)]*)\)|<([0-9a-fA-F]*)>)[ \t\r\n]+(\d+)[ \t\r\n]+\d+[ \t\r\n]+R")
            .unwrap();
    static ref EF_STREAM_REF: Regex =
        Regex::new(r"/EF[ \t\r\n]*<<[ \t\r\n]*/(?:F|UF)[ \t\r\n]+(\d+)[ \t\r\n]+\d+[ \t\r\n]+R")
            .unwrap();
}

/// Embed the payload as `font_license.txt`, returning the new file bytes.
pub fn inject(buf: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let mut rewriter = PdfRewriter::parse(buf)?;

    let checksum = {
        let mut hasher = Md5::new();
        hasher.update(payload);
        hasher.finalize()
    };
    let checksum_hex: String = checksum.iter().map(|b| format!("{:02x}", b)).collect();

    let stream_id = rewriter.add_stream(
        &format!(
            "/Type /EmbeddedFile /Subtype /text#2Fplain /Params << /Size {} /CheckSum <{}> >>",
            payload.len(),
            checksum_hex
        ),
        payload,
    );

    let filespec = format!(
        "<< /Type /Filespec /F ({name}) /UF <{uf}> /EF << /F {id} 0 R /UF {id} 0 R >> >>",
        name = ATTACH_NAME,
        uf = utf16_be_hex(ATTACH_NAME),
        id = stream_id
    );
    let filespec_id = rewriter.add(filespec.into_bytes());

    attach_to_name_tree(&mut rewriter, ATTACH_NAME, filespec_id)?;
    Ok(rewriter.serialize())
}

/// Register `(name) -> filespec` in the catalog's EmbeddedFiles tree,
/// creating `/Names` and `/EmbeddedFiles` as needed.
fn attach_to_name_tree(rewriter: &mut PdfRewriter, name: &str, filespec_id: u32) -> Result<()> {
    let root = rewriter.root_id();
    let body = rewriter
        .body(root)
        .ok_or_else(|| Error::InvalidPdf("catalog object missing".into()))?
        .to_vec();
    let pair = format!("({}) {} 0 R", name, filespec_id);

    let updated = if let Some((n_open, n_end)) = subdict_span(&body, "/Names") {
        let names_text = &body[n_open..n_end];
        if let Some((ef_open, _)) = subdict_span(names_text, "/EmbeddedFiles") {
            // Existing tree: append the pair inside its /Names array
            let ef_abs = n_open + ef_open;
            let ef_end = matching_dict_end(&body, ef_abs)
                .ok_or_else(|| Error::InvalidPdf("unterminated /EmbeddedFiles".into()))?;
            let ef_text = &body[ef_abs..ef_end];
            let bracket = ef_text
                .iter()
                .position(|&b| b == b'[')
                .ok_or_else(|| Error::InvalidPdf("/EmbeddedFiles without /Names array".into()))?;
            let close = ef_text[bracket..]
                .iter()
                .position(|&b| b == b']')
                .map(|i| ef_abs + bracket + i)
                .ok_or_else(|| Error::InvalidPdf("unterminated /Names array".into()))?;
            splice(&body, close, &format!(" {} ", pair))
        } else {
            // /Names exists without an embedded-files tree
            let insert_at = n_end - 2;
            splice(
                &body,
                insert_at,
                &format!("/EmbeddedFiles << /Names [ {} ] >> ", pair),
            )
        }
    } else {
        insert_into_dict(
            &body,
            &format!("/Names << /EmbeddedFiles << /Names [ {} ] >> >>", pair),
        )
        .ok_or_else(|| Error::InvalidPdf("catalog object has no dictionary".into()))?
    };

    rewriter.set_body(root, updated);
    Ok(())
}

/// Retrieve the raw bytes of the `font_license.txt` attachment.
pub fn extract(buf: &[u8]) -> Result<Vec<u8>> {
    let names = NAMES_ARRAY
        .captures(buf)
        .ok_or_else(|| Error::AttachmentNotFound(ATTACH_NAME.into()))?;

    let objects: std::collections::HashMap<u32, engine::ObjectSpan> = engine::find_objects(buf)
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    for pair in NAME_PAIR.captures_iter(&names[1]) {
        let name = match (pair.get(1), pair.get(2)) {
            (Some(lit), _) => String::from_utf8_lossy(lit.as_bytes()).to_string(),
            (None, Some(hex)) => hex_to_string(hex.as_bytes()),
            _ => continue,
        };
        if name != ATTACH_NAME {
            continue;
        }
        let filespec_id: u32 = std::str::from_utf8(&pair[3])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::AttachmentNotFound(ATTACH_NAME.into()))?;
        let filespec = objects
            .get(&filespec_id)
            .ok_or_else(|| Error::AttachmentNotFound(ATTACH_NAME.into()))?;
        let ef = EF_STREAM_REF
            .captures(filespec.body(buf))
            .ok_or_else(|| Error::AttachmentNotFound(ATTACH_NAME.into()))?;
        let stream_id: u32 = std::str::from_utf8(&ef[1])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::AttachmentNotFound(ATTACH_NAME.into()))?;
        let stream_obj = objects
            .get(&stream_id)
            .ok_or_else(|| Error::AttachmentNotFound(ATTACH_NAME.into()))?;
        let span = stream_obj
            .stream
            .ok_or_else(|| Error::AttachmentNotFound(ATTACH_NAME.into()))?;
        return engine::decode_stream(stream_obj.dict(buf), &buf[span.start..span.end]);
    }

    Err(Error::AttachmentNotFound(ATTACH_NAME.into()))
}

fn utf16_be_hex(s: &str) -> String {
    let mut hex = String::from("FEFF");
    for unit in s.encode_utf16() {
        hex.push_str(&format!("{:04X}", unit));
    }
    hex
}

fn hex_to_string(hex: &[u8]) -> String {
    let mut out = Vec::new();
    let mut iter = hex.chunks_exact(2);
    for pair in &mut iter {
        let hi = (pair[0] as char).to_digit(16);
        let lo = (pair[1] as char).to_digit(16);
        if let (Some(hi), Some(lo)) = (hi, lo) {
            out.push((hi * 16 + lo) as u8);
        }
    }
    String::from_utf8_lossy(&out).to_string()
}

fn splice(text: &[u8], at: usize, insert: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + insert.len());
    out.extend_from_slice(&text[..at]);
    out.extend_from_slice(insert.as_bytes());
    out.extend_from_slice(&text[at..]);
    out
}
