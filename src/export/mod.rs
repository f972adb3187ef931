//! Notebook rendering to HTML.

use crate::error::{NbpackError, Result};
use crate::execute::{failure_message, resolve_program};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Renders a notebook document to a standalone HTML file.
pub trait Exporter {
    /// Render `notebook` to `output` (or next to it with `.html`), returning
    /// the written path.
    fn export_html(&self, notebook: &Path, output: Option<&Path>) -> Result<PathBuf>;
}

/// Exports notebooks with `jupyter nbconvert --to html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbconvertExporter {
    program: String,
}

impl Default for NbconvertExporter {
    fn default() -> Self {
        Self::new("jupyter")
    }
}

impl NbconvertExporter {
    /// Exporter using `program` (normally `jupyter`).
    pub fn new(program: impl Into<String>) -> Self {
        NbconvertExporter { program: program.into() }
    }
}

/// Where an export lands when no output path is given.
pub fn default_html_path(notebook: &Path) -> PathBuf {
    notebook.with_extension("html")
}

impl Exporter for NbconvertExporter {
    fn export_html(&self, notebook: &Path, output: Option<&Path>) -> Result<PathBuf> {
        if !notebook.is_file() {
            return Err(NbpackError::not_found("Notebook", notebook));
        }
        let out_path = output.map(Path::to_path_buf).unwrap_or_else(|| default_html_path(notebook));
        let out_dir = out_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(out_dir).map_err(|e| NbpackError::io(out_dir, e))?;
        let stem = out_path
            .file_stem()
            .ok_or_else(|| NbpackError::Export {
                path: notebook.to_path_buf(),
                message: format!("Output path has no file name: {}", out_path.display()),
            })?
            .to_os_string();
        let program = resolve_program(&self.program)?;

        log::info!("Exporting notebook to HTML: {}", notebook.display());
        let output = Command::new(program)
            .args(["nbconvert", "--to", "html", "--output"])
            .arg(stem)
            .arg("--output-dir")
            .arg(out_dir)
            .arg(notebook)
            .output()
            .map_err(|e| NbpackError::io(notebook, e))?;
        if !output.status.success() {
            return Err(NbpackError::Export {
                path: notebook.to_path_buf(),
                message: failure_message(&output),
            });
        }

        log::info!("HTML exported: {}", out_path.display());
        Ok(out_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_html_path() {
        assert_eq!(
            default_html_path(Path::new("run/hw_completed.ipynb")),
            PathBuf::from("run/hw_completed.html")
        );
    }

    #[test]
    fn test_missing_tool() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let nb = dir.path().join("x.ipynb");
        fs::write(&nb, "{}").unwrap();

        let result = NbconvertExporter::new("nbpack-no-such-jupyter-binary").export_html(&nb, None);

        assert!(matches!(result, Err(NbpackError::ToolNotAvailable { .. })));
    }
}
