//! Notebook document model (nbformat v4) and its reader/writer.
//!
//! Cells keep every field they were read with: anything not modelled here
//! (`execution_count`, `attachments`, ...) lands in `extra` and is written
//! back unchanged.

use crate::error::{NbpackError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Notebook cell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// Executable code cell.
    Code,
    /// Markdown prose cell.
    Markdown,
    /// Raw cell, passed through untouched.
    Raw,
}

impl CellType {
    /// Convert cell type to its nbformat name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Raw => "raw",
        }
    }
}

/// A full notebook document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Cells in document order.
    pub cells: Vec<Cell>,
    /// Notebook-level metadata (kernelspec, language_info, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Major format version.
    #[serde(default = "default_nbformat")]
    pub nbformat: u32,
    /// Minor format version.
    #[serde(default = "default_nbformat_minor")]
    pub nbformat_minor: u32,
}

fn default_nbformat() -> u32 {
    4
}

fn default_nbformat_minor() -> u32 {
    5
}

impl Default for Notebook {
    fn default() -> Self {
        Notebook {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: default_nbformat(),
            nbformat_minor: default_nbformat_minor(),
        }
    }
}

impl Notebook {
    /// Create an empty nbformat 4.5 notebook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kernel name from `metadata.kernelspec.name`, if any.
    pub fn kernel_name(&self) -> Option<String> {
        self.metadata
            .get("kernelspec")
            .and_then(|ks| ks.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// A single notebook cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell type.
    pub cell_type: CellType,
    /// Cell id (nbformat >= 4.5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Cell metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Cell source, joined into one string.
    #[serde(with = "multiline")]
    pub source: String,
    /// Outputs (code cells only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Value>>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    /// New code cell with no outputs.
    pub fn code(source: impl Into<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("execution_count".to_string(), Value::Null);
        Cell {
            cell_type: CellType::Code,
            id: None,
            metadata: Map::new(),
            source: source.into(),
            outputs: Some(Vec::new()),
            extra,
        }
    }

    /// New markdown cell.
    pub fn markdown(source: impl Into<String>) -> Self {
        Self::plain(CellType::Markdown, source)
    }

    /// New raw cell.
    pub fn raw(source: impl Into<String>) -> Self {
        Self::plain(CellType::Raw, source)
    }

    /// Set the cell id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the cell outputs.
    pub fn with_outputs(mut self, outputs: Vec<Value>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    fn plain(cell_type: CellType, source: impl Into<String>) -> Self {
        Cell {
            cell_type,
            id: None,
            metadata: Map::new(),
            source: source.into(),
            outputs: None,
            extra: Map::new(),
        }
    }
}

/// Read a notebook from disk.
pub fn read_notebook(path: &Path) -> Result<Notebook> {
    let content = fs::read_to_string(path).map_err(|e| NbpackError::io(path, e))?;
    parse_notebook(&content, path)
}

/// Parse notebook JSON; `path` is only used for error messages.
pub fn parse_notebook(content: &str, path: &Path) -> Result<Notebook> {
    serde_json::from_str(content).map_err(|e| NbpackError::InvalidNotebook {
        path: path.to_path_buf(),
        message: format!("JSON parse error: {}", e),
    })
}

/// Write a notebook to disk, creating parent directories.
pub fn write_notebook(notebook: &Notebook, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| NbpackError::io(parent, e))?;
    }
    let mut json = serde_json::to_string_pretty(notebook).map_err(|e| NbpackError::InvalidNotebook {
        path: path.to_path_buf(),
        message: format!("Failed to serialize notebook: {}", e),
    })?;
    json.push('\n');
    fs::write(path, json).map_err(|e| NbpackError::io(path, e))
}

/// Join an nbformat multiline value (string or list of strings).
pub fn join_multiline(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => parts
            .iter()
            .map(|p| p.as_str())
            .collect::<Option<Vec<_>>>()
            .map(|p| p.concat()),
        _ => None,
    }
}

/// nbformat stores text either as one string or as a list of lines.
mod multiline {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Multiline {
        One(String),
        Lines(Vec<String>),
    }

    pub fn serialize<S: Serializer>(source: &str, serializer: S) -> Result<S::Ok, S::Error> {
        let lines: Vec<&str> = source.split_inclusive('\n').collect();
        serializer.collect_seq(lines)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Multiline::deserialize(deserializer)? {
            Multiline::One(s) => s,
            Multiline::Lines(lines) => lines.concat(),
        })
    }
}
