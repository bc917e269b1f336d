//! Regex-level object location.
//!
//! Finds `id gen obj … endobj` spans, stream boundaries, `%%EOF` markers,
//! and `id gen R` references. Matches inside stream data are avoided by
//! scanning forward object-by-object instead of collecting every pattern
//! hit in the buffer.

use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref OBJ_HEAD: Regex = Regex::new(r"(\d+)[ \t\r\n]+(\d+)[ \t\r\n]+obj\b").unwrap();
    static ref REFERENCE: Regex = Regex::new(r"(\d+)[ \t\r\n]+(\d+)[ \t\r\n]+R\b").unwrap();
    static ref ROOT: Regex = Regex::new(r"/Root[ \t\r\n]+(\d+)[ \t\r\n]+(\d+)[ \t\r\n]+R").unwrap();
    static ref PAGE_TYPE: Regex = Regex::new(r"/Type[ \t\r\n]*/Page\b").unwrap();
}

/// Half-open byte range of decoded-stream *raw* content inside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpan {
    /// First byte of raw stream content (after the newline that follows
    /// the `stream` keyword).
    pub start: usize,
    /// One past the last content byte (before the EOL preceding
    /// `endstream`).
    pub end: usize,
}

/// A located indirect object.
#[derive(Debug, Clone)]
pub struct ObjectSpan {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
    /// Offset of the first digit of the object number
    pub start: usize,
    /// One past the end of the `endobj` keyword
    pub end: usize,
    /// Offset just past the `obj` keyword
    pub body_start: usize,
    /// Offset of the `endobj` keyword
    pub body_end: usize,
    /// Raw stream content range, when the object carries a stream
    pub stream: Option<StreamSpan>,
}

impl ObjectSpan {
    /// The object body bytes (dictionary plus any stream region).
    pub fn body<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.body_start..self.body_end]
    }

    /// The dictionary portion of the body: everything before the `stream`
    /// keyword, or the whole body for streamless objects.
    pub fn dict<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        match self.stream {
            Some(s) => {
                let keyword = find_sub(&buf[self.body_start..s.start], b"stream")
                    .map(|i| self.body_start + i)
                    .unwrap_or(self.body_start);
                &buf[self.body_start..keyword]
            }
            None => self.body(buf),
        }
    }
}

fn find_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind_sub(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Locate every `id gen obj … endobj` span in order.
///
/// The scan advances past each object's stream region before looking for
/// the next header, so `N 0 obj` byte patterns inside compressed data do
/// not produce phantom objects.
pub fn find_objects(buf: &[u8]) -> Vec<ObjectSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0usize;

    while cursor < buf.len() {
        let m = match OBJ_HEAD.captures(&buf[cursor..]) {
            Some(m) => m,
            None => break,
        };
        let whole = m.get(0).unwrap();
        let start = cursor + whole.start();
        let body_start = cursor + whole.end();

        let id: u32 = match std::str::from_utf8(&m[1]).ok().and_then(|s| s.parse().ok()) {
            Some(v) => v,
            None => {
                cursor = body_start;
                continue;
            }
        };
        let gen: u16 = std::str::from_utf8(&m[2])
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        match scan_object_end(buf, body_start) {
            Some((body_end, end, stream)) => {
                spans.push(ObjectSpan {
                    id,
                    gen,
                    start,
                    end,
                    body_start,
                    body_end,
                    stream,
                });
                cursor = end;
            }
            None => {
                // Broken object, skip the header and keep scanning
                cursor = body_start;
            }
        }
    }

    spans
}

/// Find the end of an object body starting at `body_start`.
///
/// Returns `(body_end, end_of_endobj, stream)`.
fn scan_object_end(buf: &[u8], body_start: usize) -> Option<(usize, usize, Option<StreamSpan>)> {
    let window = &buf[body_start..];
    let endobj_rel = find_sub(window, b"endobj");
    let stream_rel = find_sub(window, b"stream");

    // `stream` before the first `endobj` means the endobj bytes we found
    // may be inside stream data; resolve the stream region first.
    if let (Some(s_rel), Some(e_rel)) = (stream_rel, endobj_rel) {
        if s_rel < e_rel {
            let stream = stream_span_at(buf, body_start + s_rel)?;
            let after = rfind_endstream_end(buf, stream.end)?;
            let endobj_rel2 = find_sub(&buf[after..], b"endobj")?;
            let body_end = after + endobj_rel2;
            return Some((body_end, body_end + b"endobj".len(), Some(stream)));
        }
    }

    let e_rel = endobj_rel?;
    let body_end = body_start + e_rel;
    Some((body_end, body_end + b"endobj".len(), None))
}

/// Compute the stream content span given the offset of the `stream`
/// keyword.
fn stream_span_at(buf: &[u8], keyword: usize) -> Option<StreamSpan> {
    let mut start = keyword + b"stream".len();
    // Single EOL after the keyword
    if buf.get(start) == Some(&b'\r') {
        start += 1;
    }
    if buf.get(start) == Some(&b'\n') {
        start += 1;
    }

    let end_rel = find_sub(&buf[start..], b"endstream")?;
    let mut end = start + end_rel;
    // Back off the single EOL that precedes `endstream`
    if end > start && buf[end - 1] == b'\n' {
        end -= 1;
        if end > start && buf[end - 1] == b'\r' {
            end -= 1;
        }
    } else if end > start && buf[end - 1] == b'\r' {
        end -= 1;
    }
    Some(StreamSpan { start, end })
}

/// Offset one past `endstream` given a stream content end.
fn rfind_endstream_end(buf: &[u8], content_end: usize) -> Option<usize> {
    let rel = find_sub(&buf[content_end..], b"endstream")?;
    Some(content_end + rel + b"endstream".len())
}

/// Locate the stream region of an already-located object, if any.
pub fn find_stream(buf: &[u8], span: &ObjectSpan) -> Option<StreamSpan> {
    let body = &buf[span.body_start..span.body_end.min(buf.len())];
    let keyword = find_sub(body, b"stream")?;
    stream_span_at(buf, span.body_start + keyword)
}

/// Offset of the last `%%EOF` marker, or `None`.
pub fn find_last_eof(buf: &[u8]) -> Option<usize> {
    rfind_sub(buf, b"%%EOF")
}

/// Offsets of every `%%EOF` marker, in file order.
pub fn find_all_eof(buf: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut cursor = 0usize;
    while let Some(rel) = find_sub(&buf[cursor..], b"%%EOF") {
        offsets.push(cursor + rel);
        cursor += rel + b"%%EOF".len();
    }
    offsets
}

/// Every `id gen R` reference in the data, as a multiset of object ids.
pub fn find_references(data: &[u8]) -> Vec<u32> {
    REFERENCE
        .captures_iter(data)
        .filter_map(|c| std::str::from_utf8(&c[1]).ok()?.parse().ok())
        .collect()
}

/// Object id named by the last `/Root id gen R` in the buffer.
///
/// The last occurrence wins so that incremental updates override the
/// original trailer.
pub fn find_root(buf: &[u8]) -> Option<u32> {
    ROOT.captures_iter(buf)
        .last()
        .and_then(|c| std::str::from_utf8(&c[1]).ok()?.parse().ok())
}

/// Number of `/Type /Page` objects in the buffer.
pub fn count_pages(buf: &[u8]) -> usize {
    find_objects(buf)
        .iter()
        .filter(|span| PAGE_TYPE.is_match(span.dict(buf)))
        .count()
}
