//! Asset classification from file extensions.
//!
//! Table-driven classification. No heuristics, no content sniffing.
//! Unknown extensions fall back to `supplement`.

use crate::models::AssetType;
use std::path::Path;

/// Lowercase extension of `path` without the dot.
///
/// Returns `None` when the file name has no extension.
pub fn file_format(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Classify a file by its extension.
///
/// Extensions are compared case-insensitively.
///
/// # Examples
///
/// ```
/// # use nbpack::ingest::detect::classify;
/// # use nbpack::models::AssetType;
/// # use std::path::Path;
/// assert_eq!(classify(Path::new("hw1.ipynb")), AssetType::Notebook);
/// assert_eq!(classify(Path::new("emails.CSV")), AssetType::Data);
/// assert_eq!(classify(Path::new("bundle.zip")), AssetType::Supplement);
/// ```
pub fn classify(path: &Path) -> AssetType {
    let Some(extension) = file_format(path) else {
        return AssetType::Supplement;
    };

    match extension.as_str() {
        // Notebook
        "ipynb" => AssetType::Notebook,

        // Data
        "csv" | "tsv" | "parquet" | "json" => AssetType::Data,

        // Images
        "png" | "jpg" | "jpeg" | "gif" | "svg" => AssetType::Image,

        // Instructions
        "md" | "txt" => AssetType::Instructions,

        // Unknown extension
        _ => AssetType::Supplement,
    }
}

/// Whether the format is delimited text with a header row.
pub fn is_delimited(format: &str) -> Option<u8> {
    match format {
        "csv" => Some(b','),
        "tsv" => Some(b'\t'),
        _ => None,
    }
}

/// Whether the format is text the data repairer may rewrite.
pub fn is_repairable_text(format: &str) -> bool {
    matches!(format, "csv" | "tsv" | "json")
}

/// Whether the format is a zip-like archive whose members can be listed.
pub fn is_archive(format: &str) -> bool {
    matches!(format, "zip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_notebook() {
        assert_eq!(classify(Path::new("hw1.ipynb")), AssetType::Notebook);
    }

    #[test]
    fn test_classify_data() {
        assert_eq!(classify(Path::new("emails.csv")), AssetType::Data);
        assert_eq!(classify(Path::new("emails.tsv")), AssetType::Data);
        assert_eq!(classify(Path::new("table.parquet")), AssetType::Data);
        assert_eq!(classify(Path::new("config.json")), AssetType::Data);
    }

    #[test]
    fn test_classify_images() {
        for name in ["a.png", "a.jpg", "a.jpeg", "a.gif", "a.svg"] {
            assert_eq!(classify(Path::new(name)), AssetType::Image, "{}", name);
        }
    }

    #[test]
    fn test_classify_instructions() {
        assert_eq!(classify(Path::new("README.md")), AssetType::Instructions);
        assert_eq!(classify(Path::new("notes.txt")), AssetType::Instructions);
    }

    #[test]
    fn test_unknown_extension_is_supplement() {
        assert_eq!(classify(Path::new("slides.pptx")), AssetType::Supplement);
        assert_eq!(classify(Path::new("bundle.zip")), AssetType::Supplement);
    }

    #[test]
    fn test_no_extension_is_supplement() {
        assert_eq!(classify(Path::new("Makefile")), AssetType::Supplement);
        assert_eq!(classify(Path::new(".gitignore")), AssetType::Supplement);
        assert_eq!(file_format(Path::new("Makefile")), None);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify(Path::new("DATA.CSV")), AssetType::Data);
        assert_eq!(classify(Path::new("Plot.PNG")), AssetType::Image);
        assert_eq!(file_format(Path::new("DATA.CSV")), Some("csv".to_string()));
    }

    #[test]
    fn test_path_with_directory() {
        assert_eq!(classify(Path::new("data/raw/emails.csv")), AssetType::Data);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(is_delimited("csv"), Some(b','));
        assert_eq!(is_delimited("tsv"), Some(b'\t'));
        assert_eq!(is_delimited("json"), None);
        assert!(is_repairable_text("csv"));
        assert!(!is_repairable_text("parquet"));
        // Text files are instructions, never rewritten
        assert_eq!(classify(Path::new("notes.txt")), AssetType::Instructions);
        assert!(!is_repairable_text("txt"));
        assert!(is_archive("zip"));
    }
}
