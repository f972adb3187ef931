//! Append-only audit log of repairs applied during ingestion.

use crate::error::{NbpackError, Result};
use crate::models::{DataQualityIssue, DataTransformation};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Collects every [`DataTransformation`] in the order it was applied.
#[derive(Debug, Clone, Default)]
pub struct TransformationLog {
    entries: Vec<DataTransformation>,
}

impl TransformationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, oldest first.
    pub fn entries(&self) -> &[DataTransformation] {
        &self.entries
    }

    /// Append a record.
    pub fn log(&mut self, transformation: DataTransformation) {
        self.entries.push(transformation);
    }

    /// Render the log as numbered, human-readable blocks.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for (i, t) in self.entries.iter().enumerate() {
            lines.push(format!(
                "[{}] {} - {}",
                i + 1,
                t.issue.as_str().to_uppercase(),
                t.action
            ));
            lines.push(format!("    File: {}", t.original_path));
            lines.push(format!("    Details: {}", t.details));
            if t.records_affected > 0 {
                lines.push(format!("    Records affected: {}", t.records_affected));
            }
            if t.confidence < 1.0 {
                lines.push(format!("    Confidence: {:.0}%", t.confidence * 100.0));
            }
            if let Some(backup) = &t.backup_path {
                lines.push(format!("    Backup: {}", backup));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    /// Write `transformations.log`.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|e| NbpackError::io(path, e))
    }

    /// One-line summary grouped by issue kind.
    pub fn summary(&self) -> String {
        if self.entries.is_empty() {
            return "No transformations applied.".to_string();
        }
        let mut by_issue: BTreeMap<DataQualityIssue, usize> = BTreeMap::new();
        for t in &self.entries {
            *by_issue.entry(t.issue).or_insert(0) += 1;
        }
        let parts: Vec<String> = by_issue
            .iter()
            .map(|(issue, count)| format!("{} {}", count, issue.as_str()))
            .collect();
        format!("{} transformation(s): {}", self.entries.len(), parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn encoding_fix() -> DataTransformation {
        let mut t = DataTransformation::new(
            "data.csv",
            DataQualityIssue::Encoding,
            "Converted from windows-1252 to UTF-8",
            "Detected windows-1252 encoding with smart quotes",
        );
        t.records_affected = 5;
        t.backup_path = Some("data.csv.orig".to_string());
        t
    }

    #[test]
    fn test_empty_log() {
        let log = TransformationLog::new();
        assert!(log.entries().is_empty());
        assert_eq!(log.summary(), "No transformations applied.");
        assert_eq!(log.render(), "");
    }

    #[test]
    fn test_render_block() {
        let mut log = TransformationLog::new();
        log.log(encoding_fix());

        let text = log.render();
        assert!(text.starts_with("[1] ENCODING - Converted from windows-1252 to UTF-8"));
        assert!(text.contains("    File: data.csv"));
        assert!(text.contains("    Records affected: 5"));
        assert!(text.contains("    Backup: data.csv.orig"));
        assert!(!text.contains("Confidence"));
    }

    #[test]
    fn test_render_confidence_below_one() {
        let mut t = encoding_fix();
        t.confidence = 0.85;
        let mut log = TransformationLog::new();
        log.log(t);
        assert!(log.render().contains("    Confidence: 85%"));
    }

    #[test]
    fn test_summary_groups_issues() {
        let mut log = TransformationLog::new();
        log.log(encoding_fix());
        log.log(DataTransformation::new(
            "data.csv",
            DataQualityIssue::LineEndings,
            "Normalized CRLF to LF",
            "x",
        ));
        log.log(encoding_fix());
        assert_eq!(log.summary(), "3 transformation(s): 2 encoding, 1 line_endings");
    }

    #[test]
    fn test_save_writes_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("transformations.log");
        let mut log = TransformationLog::new();
        log.log(encoding_fix());

        log.save(&path).expect("Failed to save log");

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[1] ENCODING"));
    }
}
