//! Attacker side: detectors that find hidden data and cleaners that
//! neutralize it.
//!
//! Cleaners come in two disciplines. Length-preserving wipes overwrite
//! byte ranges with spaces so every original xref offset stays valid;
//! structural rewrites (tail truncate, rollback) change the file length
//! and rely on the trailing structure still being self-consistent.

mod canonical;
mod clean_all;
mod duplicates;
mod gaps;
mod graph;
mod rollback;
mod scan;
mod semantic;
mod signature;

pub use canonical::{canonicalize_smasks, find_smask_ids};
pub use clean_all::{clean_all, CleanAllResult};
pub use duplicates::{scan_duplicates, wipe_duplicates, DuplicateScan, FlaggedHash};
pub use gaps::{find_suspicious_gaps, sanitize_gaps, Gap};
pub use graph::{analyze_graph, prune_zombies, GraphAnalysis};
pub use rollback::{rollback, RollbackResult};
pub use scan::{check_integrity, clean_tail, scan_tail, IntegrityReport, TailScan};
pub use semantic::{
    analyze_embedded_files, strip_suspicious_attachments, wipe_suspicious_streams,
    EmbeddedFileReport, SemanticAnalysis,
};
pub use signature::wipe_signature_streams;
