//! Rebuild a notebook document from processed content.

use crate::error::Result;
use crate::models::{CellStatus, NotebookContent, NotebookCell};
use crate::notebook::{write_notebook, Cell, CellType, Notebook};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Serializes [`NotebookContent`] as an nbformat 4.5 document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotebookBuilder;

impl NotebookBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        NotebookBuilder
    }

    /// Write `content` to `output_path`, creating parent directories.
    pub fn build(&self, content: &NotebookContent, output_path: &Path) -> Result<PathBuf> {
        let notebook = self.to_notebook(content);
        write_notebook(&notebook, output_path)?;
        log::info!("Built notebook: {}", output_path.display());
        Ok(output_path.to_path_buf())
    }

    /// The document `build` would write.
    pub fn to_notebook(&self, content: &NotebookContent) -> Notebook {
        let mut notebook = Notebook::new();
        notebook.metadata = content.metadata.clone();
        notebook.cells = content.cells.iter().map(build_cell).collect();
        notebook
    }
}

fn build_cell(cell: &NotebookCell) -> Cell {
    let built = match cell.cell_type {
        CellType::Code => {
            let code = Cell::code(cell.source.clone());
            match (&cell.outputs, cell.status) {
                // Completed cells get fresh outputs from execution
                (_, CellStatus::Completed) => code,
                (Some(outputs), _) => code.with_outputs(outputs.clone()),
                (None, _) => code,
            }
        }
        CellType::Markdown => Cell::markdown(cell.source.clone()),
        CellType::Raw => Cell::raw(cell.source.clone()),
    };
    let id = cell.id.clone().unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    built.with_id(id)
}
