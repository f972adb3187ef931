//! Data model shared by ingestion and processing.
//!
//! Ingestion produces [`Asset`]s, [`DataTransformation`] audit records and a
//! [`NotebookAnalysis`]; processing works on [`NotebookContent`].

use crate::notebook::CellType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Classification of a file inside a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    /// The assignment notebook.
    Notebook,
    /// Tabular or structured data.
    Data,
    /// Raster or vector image.
    Image,
    /// Instruction text.
    Instructions,
    /// Anything else.
    Supplement,
}

impl AssetType {
    /// Convert asset type to string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Notebook => "notebook",
            AssetType::Data => "data",
            AssetType::Image => "image",
            AssetType::Instructions => "instructions",
            AssetType::Supplement => "supplement",
        }
    }
}

/// Kind of data-quality issue a transformation repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityIssue {
    /// Non-UTF-8 character encoding.
    Encoding,
    /// CRLF line endings.
    LineEndings,
    /// Missing cells.
    MissingValues,
    /// Mixed value types in a column.
    InconsistentTypes,
}

impl DataQualityIssue {
    /// Convert issue to its persisted name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataQualityIssue::Encoding => "encoding",
            DataQualityIssue::LineEndings => "line_endings",
            DataQualityIssue::MissingValues => "missing_values",
            DataQualityIssue::InconsistentTypes => "inconsistent_types",
        }
    }
}

/// Summary of a tabular file. Never holds the full content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSchema {
    /// Header names in file order.
    pub columns: Vec<String>,
    /// Inferred kind per column: `int64`, `float64` or `object`.
    #[serde(default)]
    pub dtypes: BTreeMap<String, String>,
    /// Number of data rows (header excluded).
    pub row_count: usize,
    /// Up to three leading rows.
    #[serde(default)]
    pub sample_head: Vec<Map<String, Value>>,
    /// Up to three trailing rows.
    #[serde(default)]
    pub sample_tail: Vec<Map<String, Value>>,
    /// Empty-cell count per column (columns without nulls are omitted).
    #[serde(default)]
    pub null_counts: BTreeMap<String, usize>,
}

/// Audit record for one applied repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformation {
    /// Package-relative path of the repaired file.
    pub original_path: String,
    /// What was wrong.
    pub issue: DataQualityIssue,
    /// What was done.
    pub action: String,
    /// Human-readable details.
    pub details: String,
    /// Lines, rows or items touched.
    #[serde(default)]
    pub records_affected: usize,
    /// Confidence in the repair, 0.0 to 1.0.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Package-relative path of the byte-exact backup, if one was made.
    #[serde(default)]
    pub backup_path: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl DataTransformation {
    /// New record with full confidence, no records and no backup.
    pub fn new(
        original_path: impl Into<String>,
        issue: DataQualityIssue,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        DataTransformation {
            original_path: original_path.into(),
            issue,
            action: action.into(),
            details: details.into(),
            records_affected: 0,
            confidence: default_confidence(),
            backup_path: None,
        }
    }
}

/// An embedded image moved out of the notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// Cell the image came from.
    pub cell_index: usize,
    /// Decoded size in bytes.
    pub original_size_bytes: u64,
    /// Package-relative path under `images/`.
    pub extracted_path: String,
    /// Optional caption.
    #[serde(default)]
    pub description: Option<String>,
    /// Why the image is in the notebook.
    #[serde(default = "default_purpose")]
    pub purpose: String,
}

fn default_purpose() -> String {
    "sample_output".to_string()
}

impl ExtractedImage {
    /// New sample-output image record.
    pub fn new(cell_index: usize, original_size_bytes: u64, extracted_path: impl Into<String>) -> Self {
        ExtractedImage {
            cell_index,
            original_size_bytes,
            extracted_path: extracted_path.into(),
            description: None,
            purpose: default_purpose(),
        }
    }
}

/// A completion placeholder found in a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoMarker {
    /// Cell index.
    pub cell_index: usize,
    /// `code` or `markdown`.
    pub cell_type: CellType,
    /// The rule that matched.
    pub marker_pattern: String,
    /// Variable assigned on the marker's line, if any.
    #[serde(default)]
    pub variable_name: Option<String>,
    /// Task label mentioned in the cell, if any.
    #[serde(default)]
    pub task_id: Option<String>,
    /// First 200 characters of the cell source.
    #[serde(default)]
    pub context: String,
}

/// Result of notebook preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookAnalysis {
    /// Number of cells.
    pub total_cells: usize,
    /// Cell count per cell type name.
    pub cell_type_counts: BTreeMap<String, usize>,
    /// At most one marker per cell.
    pub todo_markers: Vec<TodoMarker>,
    /// Number of images extracted.
    pub embedded_images_count: usize,
    /// Total decoded bytes of extracted images.
    pub embedded_images_total_bytes: u64,
    /// Sorted, deduplicated third-party packages.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Sorted subset of packages that talk to hosted API services.
    #[serde(default)]
    pub api_dependencies: Vec<String>,
    /// Every filename-like string literal, in source order.
    #[serde(default)]
    pub hardcoded_paths: Vec<String>,
    /// Kernel name from notebook metadata.
    #[serde(default)]
    pub kernel_spec: Option<String>,
}

/// One classified file inside a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Package-relative path, `/`-separated.
    pub path: String,
    /// Classification.
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    /// Lowercase extension without the dot (`unknown` when absent).
    pub format: String,
    /// File size at scan time.
    pub size_bytes: u64,
    /// Schema summary for CSV/TSV files.
    #[serde(default)]
    pub schema_info: Option<DataSchema>,
    /// Member names for zip archives.
    #[serde(default)]
    pub contents: Option<Vec<String>>,
    /// Repairs applied to this file.
    #[serde(default)]
    pub transformations: Vec<DataTransformation>,
    /// Images extracted from this file.
    #[serde(default)]
    pub extracted_images: Vec<ExtractedImage>,
}

impl Asset {
    /// New asset without schema, contents or history.
    pub fn new(path: impl Into<String>, asset_type: AssetType, format: impl Into<String>, size_bytes: u64) -> Self {
        Asset {
            path: path.into(),
            asset_type,
            format: format.into(),
            size_bytes,
            schema_info: None,
            contents: None,
            transformations: Vec::new(),
            extracted_images: Vec::new(),
        }
    }
}

/// Processing status of a notebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    /// Untouched cell.
    Original,
    /// Code cell that needs completion.
    TodoCode,
    /// Markdown cell that needs an answer.
    TodoMarkdown,
    /// Cell filled in by a solver.
    Completed,
    /// Cell inserted by a solver.
    Added,
}

/// A parsed cell with processing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookCell {
    /// Position in the document, `0..N-1`.
    pub index: usize,
    /// Cell id from the document, if any.
    #[serde(default)]
    pub id: Option<String>,
    /// Cell type.
    pub cell_type: CellType,
    /// Current source.
    pub source: String,
    /// Processing status.
    #[serde(default = "default_status")]
    pub status: CellStatus,
    /// Source before a solver replaced it.
    #[serde(default)]
    pub original_source: Option<String>,
    /// Outputs carried over from the document (code cells only).
    #[serde(default)]
    pub outputs: Option<Vec<Value>>,
}

fn default_status() -> CellStatus {
    CellStatus::Original
}

/// Companion instruction file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionFile {
    /// File path.
    pub path: PathBuf,
    /// Full text.
    pub content: String,
    /// Image files next to the instructions.
    #[serde(default)]
    pub images: Vec<PathBuf>,
}

/// A parsed notebook with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookContent {
    /// Path of the source notebook.
    pub path: PathBuf,
    /// Cells in document order.
    pub cells: Vec<NotebookCell>,
    /// Notebook metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Companion instructions, if found.
    #[serde(default)]
    pub instructions: Option<InstructionFile>,
    /// Kernel name from metadata.
    #[serde(default)]
    pub kernel_spec: Option<String>,
}

impl NotebookContent {
    /// Cells still waiting for a solver.
    pub fn todo_cells(&self) -> impl Iterator<Item = &NotebookCell> {
        self.cells
            .iter()
            .filter(|c| matches!(c.status, CellStatus::TodoCode | CellStatus::TodoMarkdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_asset_type_values() {
        assert_eq!(serde_json::to_value(AssetType::Notebook).unwrap(), json!("notebook"));
        assert_eq!(serde_json::to_value(AssetType::Supplement).unwrap(), json!("supplement"));
        assert_eq!(AssetType::Instructions.as_str(), "instructions");
    }

    #[test]
    fn test_issue_values() {
        assert_eq!(
            serde_json::to_value(DataQualityIssue::LineEndings).unwrap(),
            json!("line_endings")
        );
        assert_eq!(DataQualityIssue::InconsistentTypes.as_str(), "inconsistent_types");
    }

    #[test]
    fn test_transformation_defaults() {
        let t: DataTransformation = serde_json::from_value(json!({
            "original_path": "data.csv",
            "issue": "encoding",
            "action": "Converted windows-1252 to UTF-8",
            "details": "x"
        }))
        .unwrap();
        assert_eq!(t.records_affected, 0);
        assert_eq!(t.confidence, 1.0);
        assert_eq!(t.backup_path, None);
    }

    #[test]
    fn test_invalid_issue_rejected() {
        let result = serde_json::from_value::<DataTransformation>(json!({
            "original_path": "data.csv",
            "issue": "bad_issue",
            "action": "x",
            "details": "x"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_extracted_image_default_purpose() {
        let img = ExtractedImage::new(5, 12345, "images/sample_output_cell5_0.png");
        assert_eq!(img.purpose, "sample_output");
        assert_eq!(img.description, None);
    }

    #[test]
    fn test_asset_serializes_type_field() {
        let asset = Asset::new("notebook.ipynb", AssetType::Notebook, "ipynb", 1024);
        let value = serde_json::to_value(&asset).unwrap();
        assert_eq!(value["type"], json!("notebook"));
        assert!(asset.transformations.is_empty());
        assert!(asset.extracted_images.is_empty());
    }

    #[test]
    fn test_todo_cells_filter() {
        let cell = |index, status| NotebookCell {
            index,
            id: None,
            cell_type: CellType::Code,
            source: String::new(),
            status,
            original_source: None,
            outputs: None,
        };
        let content = NotebookContent {
            path: PathBuf::from("nb.ipynb"),
            cells: vec![
                cell(0, CellStatus::Original),
                cell(1, CellStatus::TodoCode),
                cell(2, CellStatus::TodoMarkdown),
                cell(3, CellStatus::Completed),
            ],
            metadata: Map::new(),
            instructions: None,
            kernel_spec: None,
        };
        let indices: Vec<usize> = content.todo_cells().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }
}
