//! Archive idempotence tests.

use nbpack::archive::{archive, ArchiveReport};
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearchive_leaves_identical_files_untouched() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let src = dir.path().join("input");
        let done = dir.path().join("done");
        fs::create_dir_all(src.join("images")).unwrap();
        fs::write(src.join("hw.ipynb"), r#"{"cells": []}"#).unwrap();
        fs::write(src.join("images/fig.png"), [0x89, b'P', b'N', b'G']).unwrap();

        archive(&src, &done).expect("First archive should succeed");
        let before = fs::metadata(done.join("hw.ipynb")).unwrap().modified().unwrap();

        let report = archive(&src, &done).expect("Second archive should succeed");

        assert_eq!(report, ArchiveReport { copied: 0, skipped: 2 });
        let after = fs::metadata(done.join("hw.ipynb")).unwrap().modified().unwrap();
        assert_eq!(before, after, "Identical file must not be rewritten");
    }

    #[test]
    fn test_changed_file_is_only_one_overwritten() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let src = dir.path().join("input");
        let done = dir.path().join("done");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.csv"), "x\n1\n").unwrap();
        fs::write(src.join("b.csv"), "y\n2\n").unwrap();
        archive(&src, &done).unwrap();
        let b_before = fs::metadata(done.join("b.csv")).unwrap().modified().unwrap();

        // Same size, different bytes
        fs::write(src.join("a.csv"), "x\n9\n").unwrap();
        let report = archive(&src, &done).unwrap();

        assert_eq!(report, ArchiveReport { copied: 1, skipped: 1 });
        assert_eq!(fs::read_to_string(done.join("a.csv")).unwrap(), "x\n9\n");
        assert_eq!(fs::metadata(done.join("b.csv")).unwrap().modified().unwrap(), b_before);
    }
}
