//! Inventory scan: walk a folder and classify every file.

use crate::error::{NbpackError, Result};
use crate::fsutil::relative_slash_path;
use crate::ingest::detect::{classify, file_format, is_archive, is_delimited};
use crate::ingest::encoding::decode_detected;
use crate::models::{Asset, AssetType, DataSchema};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const SAMPLE_HEAD_ROWS: usize = 3;
const SAMPLE_TAIL_ROWS: usize = 2;

/// Walks a directory tree and produces one [`Asset`] per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryScanner;

impl InventoryScanner {
    /// Create a scanner.
    pub fn new() -> Self {
        InventoryScanner
    }

    /// Classify every file under `directory`, sorted by relative path.
    pub fn scan(&self, directory: &Path) -> Result<Vec<Asset>> {
        if !directory.is_dir() {
            return Err(NbpackError::not_found("Source directory", directory));
        }

        let mut assets = Vec::new();
        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(directory).to_path_buf();
                NbpackError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_slash_path(entry.path(), directory) else {
                continue;
            };
            assets.push(self.classify_file(entry.path(), relative)?);
        }

        assets.sort_by(|a, b| a.path.cmp(&b.path));
        log::debug!("Scanned {} file(s) in {}", assets.len(), directory.display());
        Ok(assets)
    }

    fn classify_file(&self, path: &Path, relative: String) -> Result<Asset> {
        let size = fs::metadata(path).map_err(|e| NbpackError::io(path, e))?.len();
        let format = file_format(path).unwrap_or_else(|| "unknown".to_string());
        let asset_type = classify(path);
        let mut asset = Asset::new(relative, asset_type, format, size);

        if asset_type == AssetType::Data {
            if let Some(delimiter) = is_delimited(&asset.format) {
                asset.schema_info = extract_schema(path, delimiter);
            }
        } else if is_archive(&asset.format) {
            asset.contents = list_archive(path);
        }

        Ok(asset)
    }
}

/// Summarize a delimited file. `None` if it cannot be read as a table.
pub fn extract_schema(path: &Path, delimiter: u8) -> Option<DataSchema> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Could not read {}: {}", path.display(), e);
            return None;
        }
    };
    let text = decode_detected(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(str::to_string).collect(),
        Err(e) => {
            log::warn!("Could not read header of {}: {}", path.display(), e);
            return None;
        }
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => {
                log::warn!("Could not parse {}: {}", path.display(), e);
                return None;
            }
        }
    }

    let mut dtypes = BTreeMap::new();
    let mut null_counts = BTreeMap::new();
    for (i, column) in columns.iter().enumerate() {
        let cells: Vec<Option<&str>> = rows.iter().map(|row| cell_at(row, i)).collect();
        let nulls = cells.iter().filter(|c| c.is_none()).count();
        if nulls > 0 {
            null_counts.insert(column.clone(), nulls);
        }
        dtypes.insert(column.clone(), infer_dtype(cells.into_iter().flatten()).to_string());
    }

    let sample = |row: &Vec<String>| sample_row(&columns, &dtypes, row);
    let sample_head: Vec<_> = rows.iter().take(SAMPLE_HEAD_ROWS).map(sample).collect();
    let sample_tail = if rows.len() >= SAMPLE_TAIL_ROWS {
        rows[rows.len() - SAMPLE_TAIL_ROWS..].iter().map(sample).collect()
    } else {
        sample_head.clone()
    };

    Some(DataSchema {
        columns,
        dtypes,
        row_count: rows.len(),
        sample_head,
        sample_tail,
        null_counts,
    })
}

/// Non-empty, trimmed cell `i` of `row`; missing or blank cells are null.
fn cell_at(row: &[String], i: usize) -> Option<&str> {
    row.get(i).map(|c| c.trim()).filter(|c| !c.is_empty())
}

fn parses_as_float(cell: &str) -> bool {
    cell.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

/// `int64` if every cell is an integer, `float64` if every cell is a number,
/// `object` otherwise (including all-null columns).
pub fn infer_dtype<'a>(cells: impl Iterator<Item = &'a str>) -> &'static str {
    let cells: Vec<&str> = cells.collect();
    if cells.is_empty() {
        return "object";
    }
    if cells.iter().all(|c| c.parse::<i64>().is_ok()) {
        "int64"
    } else if cells.iter().all(|c| parses_as_float(c)) {
        "float64"
    } else {
        "object"
    }
}

fn sample_row(columns: &[String], dtypes: &BTreeMap<String, String>, row: &[String]) -> Map<String, Value> {
    let mut out = Map::new();
    for (i, column) in columns.iter().enumerate() {
        let value = match cell_at(row, i) {
            None => Value::Null,
            Some(cell) => match dtypes.get(column).map(String::as_str) {
                Some("int64") => cell.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
                Some("float64") => cell
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                _ => Value::String(cell.to_string()),
            },
        };
        out.insert(column.clone(), value);
    }
    out
}

/// Member names of a zip archive. `None` for a corrupt archive.
pub fn list_archive(path: &Path) -> Option<Vec<String>> {
    let file = fs::File::open(path).ok()?;
    let mut archive = match zip::ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(e) => {
            log::warn!("Could not list archive {}: {}", path.display(), e);
            return None;
        }
    };

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        match archive.by_index_raw(i) {
            Ok(member) => names.push(member.name().to_string()),
            Err(e) => {
                log::warn!("Could not list archive {}: {}", path.display(), e);
                return None;
            }
        }
    }
    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_scan_missing_directory() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let result = InventoryScanner::new().scan(&dir.path().join("nope"));
        assert!(matches!(result, Err(NbpackError::NotFound { .. })));
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let assets = InventoryScanner::new().scan(dir.path()).unwrap();
        assert!(assets.is_empty());
    }

    #[test]
    fn test_scan_sorted_relative_paths() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("hw.ipynb"), "{}").unwrap();
        fs::write(dir.path().join("data/b.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("README.md"), "# hi").unwrap();
        fs::write(dir.path().join("Makefile"), "all:").unwrap();

        let assets = InventoryScanner::new().scan(dir.path()).unwrap();
        let paths: Vec<&str> = assets.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["Makefile", "README.md", "data/b.csv", "hw.ipynb"]);
        assert_eq!(assets[0].format, "unknown");
        assert_eq!(assets[0].asset_type, AssetType::Supplement);
        assert_eq!(assets[2].asset_type, AssetType::Data);
        assert_eq!(assets[3].size_bytes, 2);
    }

    #[test]
    fn test_csv_schema() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("emails.csv");
        fs::write(
            &path,
            "id,score,subject,empty\n1,0.5,Hello,\n2,,World,\n3,1.25,,\n4,2,Again,\n",
        )
        .unwrap();

        let schema = extract_schema(&path, b',').expect("Schema expected");

        assert_eq!(schema.columns, vec!["id", "score", "subject", "empty"]);
        assert_eq!(schema.row_count, 4);
        assert_eq!(schema.dtypes["id"], "int64");
        assert_eq!(schema.dtypes["score"], "float64");
        assert_eq!(schema.dtypes["subject"], "object");
        assert_eq!(schema.dtypes["empty"], "object");
        assert_eq!(schema.null_counts.get("id"), None);
        assert_eq!(schema.null_counts["score"], 1);
        assert_eq!(schema.null_counts["empty"], 4);
        assert_eq!(schema.sample_head.len(), 3);
        assert_eq!(schema.sample_tail.len(), 2);
        assert_eq!(schema.sample_head[0]["id"], Value::from(1));
        assert_eq!(schema.sample_head[1]["score"], Value::Null);
        assert_eq!(schema.sample_tail[1]["subject"], Value::from("Again"));
    }

    #[test]
    fn test_single_row_tail_matches_head() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("one.tsv");
        fs::write(&path, "a\tb\n1\tx\n").unwrap();

        let schema = extract_schema(&path, b'\t').expect("Schema expected");
        assert_eq!(schema.row_count, 1);
        assert_eq!(schema.sample_tail, schema.sample_head);
    }

    #[test]
    fn test_infer_dtype() {
        assert_eq!(infer_dtype(["1", "-2"].into_iter()), "int64");
        assert_eq!(infer_dtype(["1", "2.5"].into_iter()), "float64");
        assert_eq!(infer_dtype(["1", "abc"].into_iter()), "object");
        assert_eq!(infer_dtype(std::iter::empty()), "object");
    }

    #[test]
    fn test_zip_listing() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("bundle.zip");
        {
            let file = fs::File::create(&path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("a.txt", options).unwrap();
            writer.write_all(b"a").unwrap();
            writer.start_file("nested/b.csv", options).unwrap();
            writer.write_all(b"x\n1\n").unwrap();
            writer.finish().unwrap();
        }

        let assets = InventoryScanner::new().scan(dir.path()).unwrap();
        assert_eq!(
            assets[0].contents,
            Some(vec!["a.txt".to_string(), "nested/b.csv".to_string()])
        );
    }

    #[test]
    fn test_corrupt_zip_has_no_contents() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("broken.zip"), b"not a zip").unwrap();

        let assets = InventoryScanner::new().scan(dir.path()).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].asset_type, AssetType::Supplement);
        assert_eq!(assets[0].contents, None);
    }
}
