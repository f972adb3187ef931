//! Notebook parsing with completion-marker status per cell.

use crate::config::CompiledRules;
use crate::error::{NbpackError, Result};
use crate::ingest::preprocess::{IMAGES_DIR, NOTEBOOK_FILE_NAME};
use crate::models::{CellStatus, InstructionFile, NotebookCell, NotebookContent};
use crate::notebook::{read_notebook, CellType};
use glob::{glob, Pattern};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Companion instructions file looked up next to the notebook.
pub const INSTRUCTIONS_FILE_NAME: &str = "instructions.md";

const INSTRUCTION_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "bmp"];

/// Reads a notebook directory into [`NotebookContent`].
#[derive(Debug, Clone)]
pub struct NotebookParser {
    code_patterns: Vec<Regex>,
    markdown_patterns: Vec<Regex>,
}

impl NotebookParser {
    /// Create a parser using the rule set's code and markdown patterns.
    pub fn new(rules: &CompiledRules) -> Self {
        NotebookParser {
            code_patterns: rules.code_todo_patterns.clone(),
            markdown_patterns: rules.markdown_todo_patterns.clone(),
        }
    }

    /// Parse the notebook in `input_dir`.
    pub fn parse(&self, input_dir: &Path) -> Result<NotebookContent> {
        let notebook_path = find_notebook(input_dir)?;
        let nb = read_notebook(&notebook_path)?;

        let cells: Vec<NotebookCell> = nb
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| NotebookCell {
                index,
                id: cell.id.clone(),
                cell_type: cell.cell_type,
                source: cell.source.clone(),
                status: self.classify(cell.cell_type, &cell.source),
                original_source: None,
                outputs: match cell.cell_type {
                    CellType::Code => cell.outputs.clone(),
                    _ => None,
                },
            })
            .collect();

        let content = NotebookContent {
            path: notebook_path,
            kernel_spec: nb.kernel_name(),
            metadata: nb.metadata,
            cells,
            instructions: load_instructions(input_dir)?,
        };
        log::debug!(
            "Parsed {} cell(s), {} to complete",
            content.cells.len(),
            content.todo_cells().count()
        );
        Ok(content)
    }

    /// Status of a cell from its type and source.
    pub fn classify(&self, cell_type: CellType, source: &str) -> CellStatus {
        match cell_type {
            CellType::Code if self.code_patterns.iter().any(|p| p.is_match(source)) || is_empty_code(source) => {
                CellStatus::TodoCode
            }
            CellType::Markdown if self.markdown_patterns.iter().any(|p| p.is_match(source)) => {
                CellStatus::TodoMarkdown
            }
            _ => CellStatus::Original,
        }
    }
}

fn is_empty_code(source: &str) -> bool {
    matches!(source.trim(), "" | "pass")
}

/// `notebook.ipynb` if present, otherwise the first `*.ipynb` by name.
pub fn find_notebook(input_dir: &Path) -> Result<PathBuf> {
    let preferred = input_dir.join(NOTEBOOK_FILE_NAME);
    if preferred.is_file() {
        return Ok(preferred);
    }

    let pattern = format!("{}/*.ipynb", Pattern::escape(&input_dir.to_string_lossy()));
    let mut found = Vec::new();
    for entry in glob(&pattern).map_err(|e| NbpackError::Other(format!("Invalid glob pattern: {}", e)))? {
        let path = entry.map_err(|e| NbpackError::Other(format!("Glob iteration error: {}", e)))?;
        if path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    found
        .into_iter()
        .next()
        .ok_or_else(|| NbpackError::not_found("Notebook (.ipynb)", input_dir))
}

fn load_instructions(input_dir: &Path) -> Result<Option<InstructionFile>> {
    let path = input_dir.join(INSTRUCTIONS_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).map_err(|e| NbpackError::io(&path, e))?;
    Ok(Some(InstructionFile {
        images: find_images(&input_dir.join(IMAGES_DIR))?,
        path,
        content,
    }))
}

fn find_images(images_dir: &Path) -> Result<Vec<PathBuf>> {
    if !images_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut images = Vec::new();
    for entry in fs::read_dir(images_dir).map_err(|e| NbpackError::io(images_dir, e))? {
        let path = entry.map_err(|e| NbpackError::io(images_dir, e))?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| INSTRUCTION_IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}
