//! Semantic embedded-file analysis and attachment cleaning.
//!
//! Each file-spec in the `/EmbeddedFiles` name tree is scored against a
//! weighted checklist (extension, name patterns, size, entropy, missing
//! structure); a total of 0.5 or more marks it suspicious. Cleaning comes
//! in two disciplines: a structural strip that removes the objects and
//! their name-tree entries, and a conservative wipe that spaces out only
//! the embedded stream bytes.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde::Serialize;

use crate::config::ScanConfig;
use crate::engine::{self, ObjectSpan};
use crate::error::{Error, Result};
use crate::rewrite::{subdict_span, PdfRewriter};

lazy_static! {
    static ref NAMES_ARRAY: Regex =
        Regex::new(r"/EmbeddedFiles[ \t\r\n]*<<[ \t\r\n]*/Names[ \t\r\n]*\[([^\]]*)\]").unwrap();
    static ref NAME_PAIR: Regex =
        Regex::new(r"(?:\(([^)]*)\)|<([0-9a-fA-F]*)>)[ \t\r\n]+(\d+)[ \t\r\n]+\d+[ \t\r\n]+R")
            .unwrap();
    static ref EF_STREAM_REF: Regex =
        Regex::new(r"/EF[ \t\r\n]*<<[ \t\r\n]*/(?:F|UF)[ \t\r\n]+(\d+)[ \t\r\n]+\d+[ \t\r\n]+R")
            .unwrap();
    static ref F_NAME: Regex = Regex::new(r"/F[ \t\r\n]*\(([^)]*)\)").unwrap();
    static ref PARAMS_SIZE: Regex = Regex::new(r"/Params[ \t\r\n]*<<[^>]*?/Size[ \t\r\n]+(\d+)").unwrap();
}

const SUSPICIOUS_EXTENSIONS: [&str; 10] = [
    ".exe", ".dll", ".bat", ".cmd", ".scr", ".vbs", ".js", ".jar", ".ps1", ".dat",
];

const SUSPICIOUS_NAME_PATTERNS: [&str; 8] = [
    "secret", "payload", "backdoor", "shell", "sys_", "stream", "temp", "cache",
];

const STANDARD_EXTENSIONS: [&str; 27] = [
    ".pdf", ".txt", ".xml", ".html", ".htm", ".css", ".jpg", ".jpeg", ".png", ".gif", ".tif",
    ".tiff", ".bmp", ".zip", ".rar", ".7z", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    ".odt", ".ods", ".odp", ".csv", ".json",
];

/// Analysis of one embedded file.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddedFileReport {
    /// File-spec object id
    pub filespec_id: u32,
    /// Embedded stream object id, when resolvable
    pub stream_id: Option<u32>,
    /// Declared or recovered file name
    pub name: String,
    /// Stream size in bytes
    pub size: usize,
    /// Whether a compression filter is declared
    pub is_compressed: bool,
    /// Declared filter name, or "none"
    pub filter: String,
    /// Shannon entropy of the raw stream bytes
    pub entropy: f64,
    /// Total checklist score
    pub score: f64,
    /// Crossed the suspicion cutoff
    pub suspicious: bool,
    /// Which rules fired
    pub reasons: Vec<String>,
}

/// Full semantic scan result.
#[derive(Debug, Serialize)]
pub struct SemanticAnalysis {
    /// Embedded files found
    pub total: usize,
    /// Files over the cutoff
    pub suspicious: Vec<EmbeddedFileReport>,
    /// Files under the cutoff
    pub clean: Vec<EmbeddedFileReport>,
    /// Sum of suspicious stream sizes
    pub total_suspicious_bytes: usize,
}

impl SemanticAnalysis {
    /// Render the analysis as a human-readable report.
    pub fn to_report(&self, source: &str) -> String {
        let mut report = String::new();
        report.push_str("# Suspicious Attachments Analysis Report\n\n");
        report.push_str(&format!("File: {}\n", source));
        report.push_str(&format!("Total embedded files: {}\n", self.total));
        report.push_str(&format!("Suspicious files: {}\n", self.suspicious.len()));
        report.push_str(&format!("Clean files: {}\n\n", self.clean.len()));

        if self.suspicious.is_empty() {
            report.push_str("No suspicious attachments detected.\n");
            return report;
        }

        for (i, file) in self.suspicious.iter().enumerate() {
            report.push_str(&format!("## Suspicious File #{}\n", i + 1));
            report.push_str(&format!("- Name: {}\n", file.name));
            report.push_str(&format!("- Object: {} 0 R\n", file.filespec_id));
            report.push_str(&format!("- Size: {} bytes\n", file.size));
            report.push_str(&format!("- Filter: {}\n", file.filter));
            report.push_str(&format!("- Entropy: {:.2}\n", file.entropy));
            report.push_str(&format!("- Score: {:.2}\n", file.score));
            report.push_str("- Reasons:\n");
            for reason in &file.reasons {
                report.push_str(&format!("  * {}\n", reason));
            }
            report.push('\n');
        }
        report
    }
}

/// Shannon entropy in bits per byte.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0usize; 256];
    for &b in data {
        freq[b as usize] += 1;
    }
    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Scan the `/EmbeddedFiles` tree and score every attachment.
pub fn analyze_embedded_files(buf: &[u8], config: &ScanConfig) -> SemanticAnalysis {
    let mut analysis = SemanticAnalysis {
        total: 0,
        suspicious: Vec::new(),
        clean: Vec::new(),
        total_suspicious_bytes: 0,
    };

    let names = match NAMES_ARRAY.captures(buf) {
        Some(c) => c,
        None => return analysis,
    };

    let objects: HashMap<u32, ObjectSpan> = engine::find_objects(buf)
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    for pair in NAME_PAIR.captures_iter(&names[1]) {
        let tree_name = match (pair.get(1), pair.get(2)) {
            (Some(lit), _) => String::from_utf8_lossy(lit.as_bytes()).to_string(),
            (None, Some(hex)) => hex_to_string(hex.as_bytes()),
            _ => continue,
        };
        let filespec_id: u32 = match std::str::from_utf8(&pair[3]).ok().and_then(|s| s.parse().ok())
        {
            Some(id) => id,
            None => continue,
        };

        let report = analyze_filespec(buf, &objects, filespec_id, tree_name, config);
        analysis.total += 1;
        if report.suspicious {
            analysis.total_suspicious_bytes += report.size;
            analysis.suspicious.push(report);
        } else {
            analysis.clean.push(report);
        }
    }

    analysis
}

fn analyze_filespec(
    buf: &[u8],
    objects: &HashMap<u32, ObjectSpan>,
    filespec_id: u32,
    tree_name: String,
    config: &ScanConfig,
) -> EmbeddedFileReport {
    let mut report = EmbeddedFileReport {
        filespec_id,
        stream_id: None,
        name: tree_name,
        size: 0,
        is_compressed: false,
        filter: "none".into(),
        entropy: 0.0,
        score: 0.0,
        suspicious: false,
        reasons: Vec::new(),
    };

    let filespec = match objects.get(&filespec_id) {
        Some(span) => span,
        None => {
            score(&mut report, 0.3, "file-spec object missing");
            finish(&mut report, config);
            return report;
        }
    };
    let body = filespec.body(buf);

    if report.name.is_empty() {
        if let Some(m) = F_NAME.captures(body) {
            report.name = String::from_utf8_lossy(&m[1]).replace('\u{0}', "");
        }
    }

    if !contains(body, b"/F") && !contains(body, b"/EF") {
        score(&mut report, 0.3, "missing standard FileSpec structure");
    }

    if let Some(ef) = EF_STREAM_REF.captures(body) {
        if let Some(stream_id) = std::str::from_utf8(&ef[1]).ok().and_then(|s| s.parse().ok()) {
            report.stream_id = Some(stream_id);
            if let Some(stream_obj) = objects.get(&stream_id) {
                inspect_stream(buf, stream_obj, &mut report);
            }
        }
    }

    apply_rules(&mut report);
    finish(&mut report, config);
    report
}

fn inspect_stream(buf: &[u8], span: &ObjectSpan, report: &mut EmbeddedFileReport) {
    let dict = span.dict(buf);

    for filter in ["FlateDecode", "DCTDecode", "CCITTFaxDecode"] {
        if contains(dict, format!("/{}", filter).as_bytes()) {
            report.is_compressed = true;
            report.filter = filter.to_string();
            break;
        }
    }

    if let Some(stream) = span.stream {
        let raw = &buf[stream.start..stream.end];
        report.size = raw.len();
        report.entropy = shannon_entropy(raw);
    }
    // A /Params /Size overrides the measured length when present
    if let Some(m) = PARAMS_SIZE.captures(dict) {
        if let Some(size) = std::str::from_utf8(&m[1]).ok().and_then(|s| s.parse().ok()) {
            report.size = size;
        }
    }
}

fn apply_rules(report: &mut EmbeddedFileReport) {
    let name = report.name.replace('\u{0}', "").to_lowercase();

    for ext in SUSPICIOUS_EXTENSIONS {
        if name.ends_with(ext) {
            score(report, 0.6, &format!("suspicious file extension: {}", ext));
        }
    }
    for pattern in SUSPICIOUS_NAME_PATTERNS {
        if name.contains(pattern) {
            score(report, 0.4, &format!("suspicious filename pattern: {}", pattern));
        }
    }
    if report.size > 10 * 1024 * 1024 {
        score(report, 0.4, "large embedded file (>10MiB)");
    }
    // 7.5 bits/byte flags near-random data; streams shorter than 256
    // bytes cannot reach that, so the bar scales with log2(len) there
    let high_entropy = if report.size >= 256 {
        report.entropy > 7.5
    } else {
        report.size > 0 && report.entropy > 0.9 * (report.size as f64).log2()
    };
    if high_entropy && !report.is_compressed {
        score(report, 0.5, "high entropy in uncompressed content");
    }
    if !STANDARD_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) && report.size > 1024 {
        score(report, 0.3, "non-standard attachment type with significant size");
    }
    if name.len() < 3 {
        score(report, 0.5, "empty or very short filename");
    }
    if name.contains("sys_stream") && name.contains(".dat") {
        score(report, 0.8, "highly suspicious filename: sys_stream.dat pattern");
    }
}

fn score(report: &mut EmbeddedFileReport, weight: f64, reason: &str) {
    report.score += weight;
    report.reasons.push(reason.to_string());
}

fn finish(report: &mut EmbeddedFileReport, config: &ScanConfig) {
    report.suspicious = report.score >= config.suspicion_cutoff;
}

/// Structurally remove every suspicious attachment: the file-spec and
/// stream objects are dropped and their name-tree entries erased, then
/// the file is re-serialized with a fresh xref.
pub fn strip_suspicious_attachments(
    buf: &[u8],
    config: &ScanConfig,
) -> Result<(Vec<u8>, SemanticAnalysis)> {
    let analysis = analyze_embedded_files(buf, config);
    if analysis.suspicious.is_empty() {
        return Ok((buf.to_vec(), analysis));
    }

    let mut rewriter = PdfRewriter::parse(buf)?;
    for file in &analysis.suspicious {
        rewriter.remove(file.filespec_id);
        if let Some(stream_id) = file.stream_id {
            rewriter.remove(stream_id);
        }
    }

    // Erase the removed pairs from whichever object holds the name tree
    let holders: Vec<u32> = rewriter
        .ids()
        .filter(|&id| {
            rewriter
                .body(id)
                .map(|b| contains(b, b"/EmbeddedFiles"))
                .unwrap_or(false)
        })
        .collect();
    let strip_all = analysis.clean.is_empty();
    for id in holders {
        let body = match rewriter.body(id) {
            Some(b) => b.to_vec(),
            None => continue,
        };
        let updated = if strip_all {
            remove_embedded_files_dict(&body)
        } else {
            remove_name_pairs(&body, &analysis.suspicious)
        };
        if let Some(updated) = updated {
            rewriter.set_body(id, updated);
        }
    }

    Ok((rewriter.serialize(), analysis))
}

/// Remove the whole `/EmbeddedFiles << ... >>` entry.
fn remove_embedded_files_dict(body: &[u8]) -> Option<Vec<u8>> {
    let (open, end) = subdict_span(body, "/EmbeddedFiles")?;
    let key_at = rfind_key(body, open, b"/EmbeddedFiles")?;
    let mut out = body[..key_at].to_vec();
    out.extend_from_slice(&body[end..]);
    Some(out)
}

/// Remove `(name) id 0 R` pairs that reference stripped file-specs.
fn remove_name_pairs(body: &[u8], removed: &[EmbeddedFileReport]) -> Option<Vec<u8>> {
    let (open, end) = subdict_span(body, "/EmbeddedFiles")?;
    let tree = &body[open..end];
    let mut cleaned = Vec::with_capacity(tree.len());
    let mut last = 0usize;
    for pair in NAME_PAIR.captures_iter(tree) {
        let whole = pair.get(0)?;
        let id: u32 = std::str::from_utf8(&pair[3]).ok()?.parse().ok()?;
        if removed.iter().any(|f| f.filespec_id == id) {
            cleaned.extend_from_slice(&tree[last..whole.start()]);
            last = whole.end();
        }
    }
    cleaned.extend_from_slice(&tree[last..]);

    let mut out = body[..open].to_vec();
    out.extend_from_slice(&cleaned);
    out.extend_from_slice(&body[end..]);
    Some(out)
}

/// Offset of the `/EmbeddedFiles` key that owns the dict starting at
/// `open`.
fn rfind_key(body: &[u8], open: usize, key: &[u8]) -> Option<usize> {
    body[..open]
        .windows(key.len())
        .rposition(|w| w == key)
}

/// Conservative variant: wipe only the embedded stream bytes with
/// spaces, leaving the tree intact. Length-preserving.
pub fn wipe_suspicious_streams(buf: &mut [u8], config: &ScanConfig) -> (usize, SemanticAnalysis) {
    let analysis = analyze_embedded_files(buf, config);
    let objects: HashMap<u32, ObjectSpan> = engine::find_objects(buf)
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut wiped = 0usize;
    for file in &analysis.suspicious {
        let stream_id = match file.stream_id {
            Some(id) => id,
            None => continue,
        };
        if let Some(stream) = objects.get(&stream_id).and_then(|s| s.stream) {
            engine::wipe_range(buf, stream.start, stream.end);
            wiped += 1;
        }
    }
    (wiped, analysis)
}

fn hex_to_string(hex: &[u8]) -> String {
    let mut out = Vec::new();
    for pair in hex.chunks_exact(2) {
        let hi = (pair[0] as char).to_digit(16);
        let lo = (pair[1] as char).to_digit(16);
        if let (Some(hi), Some(lo)) = (hi, lo) {
            out.push((hi * 16 + lo) as u8);
        }
    }
    String::from_utf8_lossy(&out).to_string()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}
