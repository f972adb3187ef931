//! Small filesystem helpers shared by the ingestion and processing sides.

use crate::error::{NbpackError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `file_path` with `content` in a single rename.
///
/// The bytes go to a temp file in the same directory first, so readers see
/// either the old file or the new one, never a half-written mix.
pub fn write_atomic(file_path: &Path, content: &[u8]) -> Result<()> {
    let file_dir = file_path
        .parent()
        .ok_or_else(|| NbpackError::Other("File has no parent directory".to_string()))?;
    fs::create_dir_all(file_dir).map_err(|e| NbpackError::io(file_dir, e))?;

    let mut temp_file = NamedTempFile::new_in(file_dir).map_err(|e| NbpackError::io(file_dir, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| NbpackError::io(temp_file.path(), e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| NbpackError::io(temp_file.path(), e))?;
    temp_file
        .persist(file_path)
        .map_err(|e| NbpackError::io(file_path, e.error))?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_atomic<T: Serialize>(file_path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        NbpackError::Other(format!(
            "Failed to serialize {}: {}",
            file_path.display(),
            e
        ))
    })?;
    write_atomic(file_path, json.as_bytes())
}

/// Compute SHA-256 hash of bytes.
pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Render a path relative to `root` with forward slashes.
///
/// Returns `None` when `path` is not under `root`.
pub fn relative_slash_path(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
