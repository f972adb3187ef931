//! In-place repair of text data files: encoding, then line endings.
//!
//! A repair either fully succeeds and is recorded, or is skipped with a
//! warning and the file is left as it was.

use crate::error::{NbpackError, Result};
use crate::fsutil::write_atomic;
use crate::ingest::detect::is_repairable_text;
use crate::ingest::encoding::{count_substitutions, decode_lossy, detect_encoding, is_utf8};
use crate::ingest::transformations::TransformationLog;
use crate::models::{Asset, DataQualityIssue, DataTransformation};
use std::fs;
use std::path::{Path, PathBuf};

/// Applies encoding and line-ending repairs to data assets.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataRepairer;

impl DataRepairer {
    /// Create a repairer.
    pub fn new() -> Self {
        DataRepairer
    }

    /// Repair `asset` inside `package_dir`, recording each applied fix on
    /// the asset and in `log`.
    pub fn repair(&self, mut asset: Asset, package_dir: &Path, log: &mut TransformationLog) -> Asset {
        let path = package_dir.join(&asset.path);
        if !path.is_file() || !is_repairable_text(&asset.format) {
            return asset;
        }

        match fix_encoding(&path, &asset.path) {
            Ok(Some(t)) => record(&mut asset, t, log),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping encoding repair of {}: {}", asset.path, e),
        }

        match fix_line_endings(&path, &asset.path) {
            Ok(Some(t)) => record(&mut asset, t, log),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping line-ending repair of {}: {}", asset.path, e),
        }

        asset
    }
}

fn record(asset: &mut Asset, transformation: DataTransformation, log: &mut TransformationLog) {
    log::info!("{}: {}", transformation.original_path, transformation.action);
    asset.transformations.push(transformation.clone());
    log.log(transformation);
}

fn read_text_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    let bytes = fs::read(path).map_err(|e| NbpackError::io(path, e))?;
    if bytes.contains(&0) {
        log::debug!("{} looks binary, not repairing", path.display());
        return Ok(None);
    }
    Ok(Some(bytes))
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".orig");
    path.with_file_name(name)
}

/// Convert a non-UTF-8 file to UTF-8, keeping a byte-exact `.orig` backup.
pub fn fix_encoding(path: &Path, relative: &str) -> Result<Option<DataTransformation>> {
    let Some(bytes) = read_text_bytes(path)? else {
        return Ok(None);
    };
    let encoding = detect_encoding(&bytes);
    if is_utf8(encoding) {
        return Ok(None);
    }

    let backup = backup_path_for(path);
    fs::write(&backup, &bytes).map_err(|e| NbpackError::io(&backup, e))?;

    let text = decode_lossy(&bytes, encoding);
    if let Err(e) = write_atomic(path, text.as_bytes()) {
        let _ = fs::remove_file(&backup);
        return Err(e);
    }

    let substitutions = count_substitutions(&bytes, encoding);
    let details = if substitutions.is_empty() {
        format!("Detected {} encoding", encoding.name())
    } else {
        let chars: Vec<String> = substitutions
            .iter()
            .map(|(ch, n)| format!("U+{:04X} ('{}') ×{}", *ch as u32, ch, n))
            .collect();
        format!(
            "Detected {} encoding; converted characters: {}",
            encoding.name(),
            chars.join(", ")
        )
    };

    let mut transformation = DataTransformation::new(
        relative,
        DataQualityIssue::Encoding,
        format!("Converted from {} to UTF-8", encoding.name()),
        details,
    );
    transformation.records_affected = text.matches('\n').count();
    transformation.backup_path = Some(format!("{}.orig", relative));
    Ok(Some(transformation))
}

/// Replace every CRLF with LF.
pub fn fix_line_endings(path: &Path, relative: &str) -> Result<Option<DataTransformation>> {
    let Some(bytes) = read_text_bytes(path)? else {
        return Ok(None);
    };
    let crlf_count = bytes.windows(2).filter(|w| *w == b"\r\n").count();
    if crlf_count == 0 {
        return Ok(None);
    }

    let mut fixed = Vec::with_capacity(bytes.len() - crlf_count);
    let mut iter = bytes.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        fixed.push(b);
    }
    write_atomic(path, &fixed)?;

    let mut transformation = DataTransformation::new(
        relative,
        DataQualityIssue::LineEndings,
        "Normalized CRLF to LF",
        format!("Replaced {} CRLF line endings with LF", crlf_count),
    );
    transformation.records_affected = crlf_count;
    Ok(Some(transformation))
}
