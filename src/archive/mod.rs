//! Idempotent directory archiving.
//!
//! Files already present and byte-identical at the destination are left
//! alone, so re-archiving an unchanged tree writes nothing.

use crate::error::{NbpackError, Result};
use crate::fsutil::compute_hash;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// What an archive pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Files written to the destination.
    pub copied: usize,
    /// Files skipped because the destination already matched.
    pub skipped: usize,
}

/// Copy every file under `src` into `dst`, preserving relative paths.
pub fn archive(src: &Path, dst: &Path) -> Result<ArchiveReport> {
    if !src.is_dir() {
        return Err(NbpackError::not_found("Input directory", src));
    }
    fs::create_dir_all(dst).map_err(|e| NbpackError::io(dst, e))?;

    let mut report = ArchiveReport::default();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            NbpackError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| NbpackError::Other(format!("{}: {}", entry.path().display(), e)))?;
        let target = dst.join(relative);

        if files_identical(entry.path(), &target)? {
            log::debug!("Skipping identical file: {}", relative.display());
            report.skipped += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| NbpackError::io(parent, e))?;
        }
        fs::copy(entry.path(), &target).map_err(|e| NbpackError::io(&target, e))?;
        log::info!("Archived: {}", relative.display());
        report.copied += 1;
    }
    Ok(report)
}

fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    if !b.is_file() {
        return Ok(false);
    }
    let size_a = fs::metadata(a).map_err(|e| NbpackError::io(a, e))?.len();
    let size_b = fs::metadata(b).map_err(|e| NbpackError::io(b, e))?.len();
    if size_a != size_b {
        return Ok(false);
    }
    let hash_a = compute_hash(&fs::read(a).map_err(|e| NbpackError::io(a, e))?);
    let hash_b = compute_hash(&fs::read(b).map_err(|e| NbpackError::io(b, e))?);
    Ok(hash_a == hash_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let result = archive(&dir.path().join("nope"), &dir.path().join("done"));
        assert!(matches!(result, Err(NbpackError::NotFound { .. })));
    }

    #[test]
    fn test_archive_copies_then_skips() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let src = dir.path().join("src");
        let dst = dir.path().join("done");
        fs::create_dir_all(src.join("data")).unwrap();
        fs::write(src.join("hw.ipynb"), "{}").unwrap();
        fs::write(src.join("data/a.csv"), "x\n1\n").unwrap();

        let first = archive(&src, &dst).unwrap();
        assert_eq!(first, ArchiveReport { copied: 2, skipped: 0 });
        assert_eq!(fs::read_to_string(dst.join("data/a.csv")).unwrap(), "x\n1\n");

        let second = archive(&src, &dst).unwrap();
        assert_eq!(second, ArchiveReport { copied: 0, skipped: 2 });

        fs::write(src.join("data/a.csv"), "x\n2\n").unwrap();
        let third = archive(&src, &dst).unwrap();
        assert_eq!(third, ArchiveReport { copied: 1, skipped: 1 });
        assert_eq!(fs::read_to_string(dst.join("data/a.csv")).unwrap(), "x\n2\n");
    }
}
