//! Output file naming.
//!
//! Every operation writes a sibling of its input with a discriminating
//! suffix; the original file is never overwritten.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Build `<dir>/<stem><suffix><ext>` next to `input`.
pub fn suffixed_path(input: &Path, suffix: &str) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("invalid file name: {}", input.display())))?;
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("pdf");
    let name = format!("{}{}.{}", stem, suffix, ext);
    Ok(input.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixed_path() {
        let out = suffixed_path(Path::new("/tmp/report.pdf"), "_signed").unwrap();
        assert_eq!(out, PathBuf::from("/tmp/report_signed.pdf"));
    }

    #[test]
    fn test_suffixed_path_no_extension() {
        let out = suffixed_path(Path::new("report"), "_cleaned").unwrap();
        assert_eq!(out, PathBuf::from("report_cleaned.pdf"));
    }

    #[test]
    fn test_relative_path_keeps_directory() {
        let out = suffixed_path(Path::new("docs/a.pdf"), "_pruned").unwrap();
        assert_eq!(out, PathBuf::from("docs/a_pruned.pdf"));
    }
}
