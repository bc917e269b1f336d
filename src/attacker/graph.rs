//! Object-graph analysis and zombie pruning.
//!
//! The reference graph is built from textual `id gen R` edges and walked
//! breadth-first from the trailer's `/Root`. Objects the walk never
//! reaches are zombie candidates. Pruning is deliberately conservative:
//! compressed object streams hide references this engine cannot see, so
//! anything that looks structural is left alone.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::engine::{self, ObjectSpan};
use crate::error::{Error, Result};

/// Markers that exempt an object from pruning. An object carrying any of
/// these may be referenced through channels the graph cannot see.
const PRUNE_WHITELIST: [&[u8]; 9] = [
    b"/ObjStm",
    b"/XRef",
    b"/Metadata",
    b"/Linearized",
    b"/Type",
    b"/Kids",
    b"/Count",
    b"/Font",
    b"/ProcSet",
];

/// Result of the reachability analysis.
#[derive(Debug, Serialize)]
pub struct GraphAnalysis {
    /// Objects located in the buffer
    pub total_objects: usize,
    /// Objects reachable from `/Root`
    pub reachable: usize,
    /// Ids of unreachable objects
    pub zombies: Vec<u32>,
}

/// Build the reference graph and find unreachable objects.
pub fn analyze_graph(buf: &[u8]) -> Result<GraphAnalysis> {
    let spans = engine::find_objects(buf);
    let mut edges: HashMap<u32, Vec<u32>> = HashMap::new();
    for span in &spans {
        edges.insert(span.id, engine::find_references(span.body(buf)));
    }

    let root = engine::find_root(buf)
        .ok_or_else(|| Error::InvalidPdf("could not find /Root in trailer".into()))?;

    let mut visited: HashSet<u32> = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(root);
    queue.push_back(root);

    while let Some(current) = queue.pop_front() {
        if let Some(refs) = edges.get(&current) {
            for &next in refs {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    let mut zombies: Vec<u32> = spans
        .iter()
        .map(|s| s.id)
        .filter(|id| !visited.contains(id))
        .collect();
    zombies.sort_unstable();
    zombies.dedup();

    Ok(GraphAnalysis {
        total_objects: edges.len(),
        reachable: spans.iter().filter(|s| visited.contains(&s.id)).count(),
        zombies,
    })
}

/// Overwrite prunable zombies with `id gen obj null endobj`, space-padded
/// in place. Returns the number of objects pruned.
pub fn prune_zombies(buf: &mut Vec<u8>) -> Result<usize> {
    let analysis = analyze_graph(buf)?;
    if analysis.zombies.is_empty() {
        return Ok(0);
    }

    let spans: HashMap<u32, ObjectSpan> = engine::find_objects(buf)
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut pruned = 0usize;
    for id in &analysis.zombies {
        let span = match spans.get(id) {
            Some(s) => s,
            None => continue,
        };
        let body = span.body(buf).to_vec();
        if is_exempt(&body) {
            log::debug!("zombie {} looks structural, skipping", id);
            continue;
        }

        let replacement = format!("{} {} obj\nnull\nendobj", span.id, span.gen);
        let (start, end) = (span.start, span.end);
        match engine::overwrite_range(buf, start, end, replacement.as_bytes()) {
            Ok(()) => pruned += 1,
            Err(_) => {
                // Object smaller than the null form: blank it instead
                engine::wipe_range(buf, start, end);
                pruned += 1;
            }
        }
    }

    Ok(pruned)
}

fn is_exempt(body: &[u8]) -> bool {
    PRUNE_WHITELIST
        .iter()
        .any(|marker| contains(body, marker))
        || contains(body, b"stream")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_with_zombie() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
        buf.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 2 0 R >>\nendobj\n");
        // Unreferenced data container with no structural markers
        buf.extend_from_slice(b"9 0 obj\n<< /Length 20 >> (hidden payload data)\nendobj\n");
        buf.extend_from_slice(b"trailer\n<< /Size 10 /Root 1 0 R >>\n%%EOF\n");
        buf
    }

    #[test]
    fn test_zombie_detected() {
        let analysis = analyze_graph(&pdf_with_zombie()).unwrap();
        assert_eq!(analysis.total_objects, 4);
        assert_eq!(analysis.reachable, 3);
        assert_eq!(analysis.zombies, vec![9]);
    }

    #[test]
    fn test_prune_replaces_with_null() {
        let mut buf = pdf_with_zombie();
        let before_len = buf.len();
        let pruned = prune_zombies(&mut buf).unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(buf.len(), before_len);
        assert!(!buf.windows(6).any(|w| w == b"hidden"));
        assert!(buf.windows(12).any(|w| w == b"9 0 obj\nnull"));
    }

    #[test]
    fn test_structural_zombie_spared() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n");
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        // Unreferenced, but carries /Font: could be reachable via an ObjStm
        buf.extend_from_slice(b"7 0 obj\n<< /Font << /F1 1 0 R >> >>\nendobj\n");
        buf.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n%%EOF\n");

        let analysis = analyze_graph(&buf).unwrap();
        assert_eq!(analysis.zombies, vec![7]);
        let pruned = prune_zombies(&mut buf).unwrap();
        assert_eq!(pruned, 0);
        assert!(buf.windows(5).any(|w| w == b"/Font"));
    }

    #[test]
    fn test_missing_root() {
        assert!(matches!(
            analyze_graph(b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\n%%EOF\n"),
            Err(Error::InvalidPdf(_))
        ));
    }
}
