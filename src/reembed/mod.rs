//! Restore original cell outputs into a completed notebook for review.
//!
//! Ingestion strips embedded images out of the package notebook, so a
//! completed run lacks the sample outputs the assignment shipped with. The
//! original notebook in `input/` still has them; this module merges them back
//! into a separate `validated.ipynb` and renders it.

use crate::error::{NbpackError, Result};
use crate::export::Exporter;
use crate::layout::ProjectLayout;
use crate::notebook::{read_notebook, write_notebook, CellType};
use crate::parse::find_notebook;
use glob::{glob, Pattern};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Merged notebook written into the run directory.
pub const VALIDATED_NOTEBOOK_NAME: &str = "validated.ipynb";
/// Rendered merged notebook.
pub const VALIDATED_HTML_NAME: &str = "validated.html";

/// Files produced by [`validate_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// The merged notebook.
    pub notebook: PathBuf,
    /// Its HTML rendering.
    pub html: PathBuf,
    /// Number of cells whose outputs were restored.
    pub restored: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CellKey {
    Id(String),
    Index(usize),
}

fn cell_key(id: Option<&String>, index: usize) -> CellKey {
    match id {
        Some(id) if !id.is_empty() => CellKey::Id(id.clone()),
        _ => CellKey::Index(index),
    }
}

/// Copy outputs of `original` code cells into matching `completed` code cells
/// that have no image output, writing the result to `output`.
///
/// Cells match by id, or by position when a cell has no id. Returns the
/// number of restored cells.
pub fn reembed_images(original: &Path, completed: &Path, output: &Path) -> Result<usize> {
    let original_nb = read_notebook(original)?;
    let mut completed_nb = read_notebook(completed)?;

    let mut original_outputs: HashMap<CellKey, Vec<Value>> = HashMap::new();
    for (i, cell) in original_nb.cells.into_iter().enumerate() {
        if cell.cell_type != CellType::Code {
            continue;
        }
        if let Some(outputs) = cell.outputs.filter(|o| !o.is_empty()) {
            original_outputs.insert(cell_key(cell.id.as_ref(), i), outputs);
        }
    }

    let mut restored = 0;
    for (i, cell) in completed_nb.cells.iter_mut().enumerate() {
        if cell.cell_type != CellType::Code {
            continue;
        }
        let Some(outputs) = original_outputs.get(&cell_key(cell.id.as_ref(), i)) else {
            continue;
        };
        if cell.outputs.as_deref().is_some_and(has_image_output) {
            continue;
        }
        cell.outputs = Some(outputs.clone());
        restored += 1;
    }

    write_notebook(&completed_nb, output)?;
    log::info!("Re-embedded outputs from {} cell(s) into {}", restored, output.display());
    Ok(restored)
}

fn has_image_output(outputs: &[Value]) -> bool {
    outputs.iter().any(|out| {
        out.get("data")
            .and_then(Value::as_object)
            .is_some_and(|data| data.keys().any(|k| k.starts_with("image/")))
    })
}

/// First `*_completed.ipynb` in `run_dir`, in sorted order.
pub fn find_completed_notebook(run_dir: &Path) -> Result<PathBuf> {
    let pattern = format!("{}/*_completed.ipynb", Pattern::escape(&run_dir.to_string_lossy()));
    let mut matches = Vec::new();
    for entry in glob(&pattern).map_err(|e| NbpackError::Other(format!("Invalid glob pattern: {}", e)))? {
        let path = entry.map_err(|e| NbpackError::Other(format!("Glob iteration error: {}", e)))?;
        matches.push(path);
    }
    matches.sort();
    matches
        .into_iter()
        .next()
        .ok_or_else(|| NbpackError::not_found("Completed notebook", run_dir))
}

/// Merge original outputs into a run's completed notebook and export it.
///
/// Uses the named run, or the latest `run-NNN` when `name` is `None`.
pub fn validate_run(layout: &ProjectLayout, name: Option<&str>, exporter: &dyn Exporter) -> Result<ValidationReport> {
    let run_dir = match name {
        Some(name) => layout.output_dir().join(name),
        None => layout
            .latest_run_dir()?
            .ok_or_else(|| NbpackError::not_found("Run", layout.output_dir()))?,
    };
    if !run_dir.is_dir() {
        return Err(NbpackError::not_found("Run", run_dir));
    }

    let completed = find_completed_notebook(&run_dir)?;
    let original = find_notebook(&layout.input_dir())?;
    let notebook = run_dir.join(VALIDATED_NOTEBOOK_NAME);
    let restored = reembed_images(&original, &completed, &notebook)?;
    let html = exporter.export_html(&notebook, Some(&run_dir.join(VALIDATED_HTML_NAME)))?;

    Ok(ValidationReport {
        notebook,
        html,
        restored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::{Cell, Notebook};
    use serde_json::json;
    use tempfile::TempDir;

    fn image_output() -> Value {
        json!({"output_type": "display_data", "data": {"image/png": "iVBORw0KGgo="}, "metadata": {}})
    }

    fn text_output(text: &str) -> Value {
        json!({"output_type": "stream", "name": "stdout", "text": text})
    }

    fn save(path: &Path, cells: Vec<Cell>) {
        let mut nb = Notebook::new();
        nb.cells = cells;
        write_notebook(&nb, path).unwrap();
    }

    #[test]
    fn test_reembed_by_id_and_index() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let original = dir.path().join("orig.ipynb");
        let completed = dir.path().join("done.ipynb");
        let out = dir.path().join("validated.ipynb");
        save(
            &original,
            vec![
                Cell::code("plot()").with_id("a").with_outputs(vec![image_output()]),
                Cell::code("show()").with_id("b").with_outputs(vec![image_output()]),
                Cell::code("x").with_outputs(vec![text_output("1")]),
                Cell::markdown("notes").with_id("m"),
            ],
        );
        save(
            &completed,
            vec![
                Cell::code("plot()").with_id("a").with_outputs(vec![text_output("new")]),
                Cell::code("show()").with_id("b").with_outputs(vec![image_output(), text_output("kept")]),
                Cell::code("x"),
                Cell::markdown("notes").with_id("m"),
            ],
        );

        let restored = reembed_images(&original, &completed, &out).unwrap();

        assert_eq!(restored, 2);
        let nb = read_notebook(&out).unwrap();
        assert_eq!(nb.cells[0].outputs.as_ref().unwrap(), &vec![image_output()]);
        assert_eq!(nb.cells[1].outputs.as_ref().unwrap().len(), 2);
        assert_eq!(nb.cells[2].outputs.as_ref().unwrap(), &vec![text_output("1")]);
        assert_eq!(nb.cells[0].source, "plot()");
    }

    #[test]
    fn test_validate_run_without_runs() {
        struct NoExport;
        impl Exporter for NoExport {
            fn export_html(&self, notebook: &Path, _output: Option<&Path>) -> Result<PathBuf> {
                Ok(notebook.to_path_buf())
            }
        }
        let dir = TempDir::new().expect("Failed to create temp dir");
        let layout = ProjectLayout::new(dir.path());
        let result = validate_run(&layout, None, &NoExport);
        assert!(matches!(result, Err(NbpackError::NotFound { .. })));
    }
}
