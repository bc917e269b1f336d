//! Page resource dictionary plumbing shared by the content and visual
//! anchors.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::rewrite::{subdict_span, PdfRewriter};

lazy_static! {
    static ref RESOURCES_REF: Regex =
        Regex::new(r"/Resources[ \t\r\n]+(\d+)[ \t\r\n]+\d+[ \t\r\n]+R").unwrap();
}

/// Register `/{name} {target} 0 R` under `/Resources /{category}` of a
/// page, creating the intermediate dictionaries as needed.
///
/// Handles `/Resources` both inline and as an indirect reference; a
/// `/{category}` given as an indirect reference is edited in the
/// referenced object.
pub(crate) fn add_page_resource(
    rewriter: &mut PdfRewriter,
    page_id: u32,
    category: &str,
    name: &str,
    target: u32,
) -> Result<()> {
    let body = rewriter
        .body(page_id)
        .ok_or_else(|| Error::InvalidPdf(format!("page object {} missing", page_id)))?
        .to_vec();

    if let Some(m) = RESOURCES_REF.captures(&body) {
        let res_id: u32 = std::str::from_utf8(&m[1])
            .map_err(|_| Error::InvalidPdf("bad /Resources reference".into()))?
            .parse()
            .map_err(|_| Error::InvalidPdf("bad /Resources reference".into()))?;
        let res_body = rewriter
            .body(res_id)
            .ok_or_else(|| Error::InvalidPdf(format!("resources object {} missing", res_id)))?
            .to_vec();
        let open = res_body
            .windows(2)
            .position(|w| w == b"<<")
            .ok_or_else(|| Error::InvalidPdf("resources object has no dictionary".into()))?;
        let end = crate::rewrite::matching_dict_end(&res_body, open)
            .ok_or_else(|| Error::InvalidPdf("unterminated resources dictionary".into()))?;
        let updated = add_category_entry(rewriter, &res_body, open, end, category, name, target)?;
        rewriter.set_body(res_id, updated);
        return Ok(());
    }

    if let Some((r_open, r_end)) = subdict_span(&body, "/Resources") {
        let updated = add_category_entry(rewriter, &body, r_open, r_end, category, name, target)?;
        rewriter.set_body(page_id, updated);
        return Ok(());
    }

    // No resources at all
    let entry = format!("/Resources << /{} << /{} {} 0 R >> >>", category, name, target);
    let updated = crate::rewrite::insert_into_dict(&body, &entry)
        .ok_or_else(|| Error::InvalidPdf("page object has no dictionary".into()))?;
    rewriter.set_body(page_id, updated);
    Ok(())
}

/// Insert the entry under `/{category}` of the resources dictionary that
/// occupies `text[res_open..res_end]`, returning the updated `text`.
fn add_category_entry(
    rewriter: &mut PdfRewriter,
    text: &[u8],
    res_open: usize,
    res_end: usize,
    category: &str,
    name: &str,
    target: u32,
) -> Result<Vec<u8>> {
    let res_text = &text[res_open..res_end];
    let key = format!("/{}", category);

    if let Some((_, c_end)) = subdict_span(res_text, &key) {
        // Inline category dictionary: insert before its closing >>
        let insert_at = res_open + c_end - 2;
        return Ok(splice(text, insert_at, &format!("/{} {} 0 R ", name, target)));
    }

    let cat_ref = Regex::new(&format!(
        r"{}[ \t\r\n]+(\d+)[ \t\r\n]+\d+[ \t\r\n]+R",
        regex::escape(&key)
    ))
    .expect("static pattern");
    if let Some(m) = cat_ref.captures(res_text) {
        // Category dictionary is indirect: edit that object instead
        let cat_id: u32 = std::str::from_utf8(&m[1])
            .map_err(|_| Error::InvalidPdf("bad resource reference".into()))?
            .parse()
            .map_err(|_| Error::InvalidPdf("bad resource reference".into()))?;
        let cat_body = rewriter
            .body(cat_id)
            .ok_or_else(|| Error::InvalidPdf(format!("resource object {} missing", cat_id)))?;
        let updated = crate::rewrite::insert_into_dict(
            cat_body,
            &format!("/{} {} 0 R", name, target),
        )
        .ok_or_else(|| Error::InvalidPdf("resource object has no dictionary".into()))?;
        rewriter.set_body(cat_id, updated);
        return Ok(text.to_vec());
    }

    // No category yet: add it to the resources dictionary
    let insert_at = res_end - 2;
    Ok(splice(
        text,
        insert_at,
        &format!("/{} << /{} {} 0 R >> ", category, name, target),
    ))
}

fn splice(text: &[u8], at: usize, insert: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + insert.len());
    out.extend_from_slice(&text[..at]);
    out.extend_from_slice(insert.as_bytes());
    out.extend_from_slice(&text[at..]);
    out
}
