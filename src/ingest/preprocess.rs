//! Notebook analysis: image extraction, marker detection, dependency and
//! hardcoded-path scanning.
//!
//! Writes the cleaned `notebook.ipynb` and a byte-exact
//! `notebook.ipynb.orig` into the package directory.

use crate::config::CompiledRules;
use crate::error::{NbpackError, Result};
use crate::ingest::imports::{extract_imports, ImportKind};
use crate::ingest::transformations::TransformationLog;
use crate::models::{DataQualityIssue, DataTransformation, ExtractedImage, NotebookAnalysis, TodoMarker};
use crate::notebook::{join_multiline, read_notebook, write_notebook, Cell, CellType, Notebook};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Name of the cleaned notebook inside a package.
pub const NOTEBOOK_FILE_NAME: &str = "notebook.ipynb";

/// Name of the preserved original notebook inside a package.
pub const NOTEBOOK_ORIG_FILE_NAME: &str = "notebook.ipynb.orig";

/// Directory extracted images are written to.
pub const IMAGES_DIR: &str = "images";

const MARKDOWN_IMAGE_PATTERN: &str = r"!\[([^\]]*)\]\(data:image/(\w+);base64,([A-Za-z0-9+/=\s]+)\)";
const ASSIGNMENT_PATTERN: &str = r"^\s*(\w+)\s*=\s*";
const TASK_ID_PATTERN: &str = r"(?i)\btask\s+(\d+[a-z]?)\b";

const CONTEXT_CHARS: usize = 200;
const DEFAULT_ALT_TEXT: &str = "Sample Output";

/// Output MIME types extracted from code cells, with the file extension used.
const IMAGE_MIME_TYPES: &[(&str, &str)] = &[("image/png", "png"), ("image/jpeg", "jpg"), ("image/gif", "gif")];

/// Analysis plus the images moved out of the notebook.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessResult {
    /// Aggregate analysis.
    pub analysis: NotebookAnalysis,
    /// Every extracted image, in extraction order.
    pub images: Vec<ExtractedImage>,
}

/// Analyzes and cleans a notebook in place.
#[derive(Debug, Clone)]
pub struct NotebookPreprocessor {
    rules: CompiledRules,
    markdown_image: Regex,
    assignment: Regex,
    task_id: Regex,
}

impl NotebookPreprocessor {
    /// Create a preprocessor with the given detection rules.
    pub fn new(rules: CompiledRules) -> Result<Self> {
        Ok(NotebookPreprocessor {
            rules,
            markdown_image: Regex::new(MARKDOWN_IMAGE_PATTERN)?,
            assignment: Regex::new(ASSIGNMENT_PATTERN)?,
            task_id: Regex::new(TASK_ID_PATTERN)?,
        })
    }

    /// Analyze `notebook_path` and write the cleaned notebook into `package_dir`.
    pub fn preprocess(
        &self,
        notebook_path: &Path,
        package_dir: &Path,
        log: &mut TransformationLog,
    ) -> Result<PreprocessResult> {
        let mut nb = read_notebook(notebook_path)?;

        let images = self.extract_images(&mut nb, package_dir)?;
        if !images.is_empty() {
            let total: u64 = images.iter().map(|i| i.original_size_bytes).sum();
            let mut t = DataTransformation::new(
                NOTEBOOK_FILE_NAME,
                DataQualityIssue::Encoding,
                "Extracted embedded images",
                format!("Extracted {} base64 image(s) totaling {} bytes", images.len(), total),
            );
            t.records_affected = images.len();
            log.log(t);
        }

        let todo_markers = self.detect_markers(&nb);
        let (dependencies, api_dependencies) = self.detect_dependencies(&nb);
        let hardcoded_paths = self.detect_hardcoded_paths(&nb);

        save_notebook(&nb, notebook_path, package_dir)?;

        let mut cell_type_counts = BTreeMap::new();
        for cell in &nb.cells {
            *cell_type_counts.entry(cell.cell_type.as_str().to_string()).or_insert(0) += 1;
        }

        let analysis = NotebookAnalysis {
            total_cells: nb.cells.len(),
            cell_type_counts,
            todo_markers,
            embedded_images_count: images.len(),
            embedded_images_total_bytes: images.iter().map(|i| i.original_size_bytes).sum(),
            dependencies,
            api_dependencies,
            hardcoded_paths,
            kernel_spec: nb.kernel_name(),
        };

        log::info!(
            "Analyzed {} cell(s): {} marker(s), {} image(s), {} dependencies",
            analysis.total_cells,
            analysis.todo_markers.len(),
            analysis.embedded_images_count,
            analysis.dependencies.len()
        );

        Ok(PreprocessResult { analysis, images })
    }

    fn extract_images(&self, nb: &mut Notebook, package_dir: &Path) -> Result<Vec<ExtractedImage>> {
        let mut extracted = Vec::new();
        for (i, cell) in nb.cells.iter_mut().enumerate() {
            match cell.cell_type {
                CellType::Code => extract_output_images(cell, i, package_dir, &mut extracted)?,
                CellType::Markdown => {
                    cell.source = self.extract_markdown_images(&cell.source, i, package_dir, &mut extracted)?;
                }
                CellType::Raw => {}
            }
        }
        Ok(extracted)
    }

    fn extract_markdown_images(
        &self,
        source: &str,
        cell_index: usize,
        package_dir: &Path,
        extracted: &mut Vec<ExtractedImage>,
    ) -> Result<String> {
        let mut out = String::with_capacity(source.len());
        let mut last = 0;
        for caps in self.markdown_image.captures_iter(source) {
            let (Some(whole), Some(subtype), Some(payload)) = (caps.get(0), caps.get(2), caps.get(3)) else {
                continue;
            };
            out.push_str(&source[last..whole.start()]);
            last = whole.end();

            let alt = caps.get(1).map(|m| m.as_str()).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_ALT_TEXT);
            let extension = match subtype.as_str() {
                "jpeg" => "jpg",
                other => other,
            };
            match save_image(payload.as_str(), extension, cell_index, extracted.len(), package_dir)? {
                Some(img) => {
                    out.push_str(&format!("![{}]({})", alt, img.extracted_path));
                    extracted.push(img);
                }
                None => out.push_str(whole.as_str()),
            }
        }
        out.push_str(&source[last..]);
        Ok(out)
    }

    fn detect_markers(&self, nb: &Notebook) -> Vec<TodoMarker> {
        let mut markers = Vec::new();
        for (i, cell) in nb.cells.iter().enumerate() {
            if cell.cell_type == CellType::Raw {
                continue;
            }
            // First matching pattern wins
            let found = self
                .rules
                .todo_patterns
                .iter()
                .find_map(|p| p.find(&cell.source).map(|m| (p, m)));
            let Some((pattern, m)) = found else {
                continue;
            };

            let line_start = cell.source[..m.start()].rfind('\n').map(|p| p + 1).unwrap_or(0);
            let line = &cell.source[line_start..m.end()];
            let variable_name = self.assignment.captures(line).and_then(|c| c.get(1)).map(|v| v.as_str().to_string());
            let task_id = self
                .task_id
                .captures(&cell.source)
                .and_then(|c| c.get(1))
                .map(|t| t.as_str().to_string());

            markers.push(TodoMarker {
                cell_index: i,
                cell_type: cell.cell_type,
                marker_pattern: pattern.as_str().to_string(),
                variable_name,
                task_id,
                context: cell.source.chars().take(CONTEXT_CHARS).collect(),
            });
        }
        markers
    }

    /// Third-party packages and the API-service subset, both sorted.
    fn detect_dependencies(&self, nb: &Notebook) -> (Vec<String>, Vec<String>) {
        let mut all = BTreeSet::new();
        for cell in code_cells(nb) {
            for fact in extract_imports(&cell.source) {
                let name = match fact.import_kind {
                    ImportKind::PipInstall => fact.module.clone(),
                    ImportKind::Import | ImportKind::From => fact.top_level().to_string(),
                };
                log::debug!("{} {} (cell {:?}): {}", fact.import_kind.as_str(), fact.module, cell.id, name);
                all.insert(name);
            }
        }

        let dependencies: Vec<String> = all
            .into_iter()
            .filter(|d| !self.rules.stdlib_modules.contains(d))
            .collect();
        let api_dependencies = dependencies
            .iter()
            .filter(|d| self.rules.api_packages.contains(*d))
            .cloned()
            .collect();
        (dependencies, api_dependencies)
    }

    fn detect_hardcoded_paths(&self, nb: &Notebook) -> Vec<String> {
        code_cells(nb)
            .flat_map(|cell| {
                self.rules
                    .hardcoded_path
                    .captures_iter(&cell.source)
                    .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

fn code_cells(nb: &Notebook) -> impl Iterator<Item = &Cell> {
    nb.cells.iter().filter(|c| c.cell_type == CellType::Code)
}

fn extract_output_images(
    cell: &mut Cell,
    cell_index: usize,
    package_dir: &Path,
    extracted: &mut Vec<ExtractedImage>,
) -> Result<()> {
    let Some(outputs) = cell.outputs.as_mut() else {
        return Ok(());
    };

    let mut kept = Vec::with_capacity(outputs.len());
    for mut output in outputs.drain(..) {
        let mut emptied = false;
        if let Some(data) = output.get_mut("data").and_then(Value::as_object_mut) {
            for (mime, extension) in IMAGE_MIME_TYPES {
                let Some(payload) = data.get(*mime).and_then(join_multiline) else {
                    continue;
                };
                if let Some(img) = save_image(&payload, extension, cell_index, extracted.len(), package_dir)? {
                    data.remove(*mime);
                    extracted.push(img);
                }
            }
            emptied = data.is_empty();
        }
        if !emptied {
            kept.push(output);
        }
    }
    *outputs = kept;
    Ok(())
}

/// Decode a base64 payload into `images/`. `None` when the payload is malformed.
fn save_image(
    payload: &str,
    extension: &str,
    cell_index: usize,
    counter: usize,
    package_dir: &Path,
) -> Result<Option<ExtractedImage>> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = match STANDARD.decode(cleaned.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::debug!("Leaving malformed image payload in cell {}: {}", cell_index, e);
            return Ok(None);
        }
    };

    let images_dir = package_dir.join(IMAGES_DIR);
    fs::create_dir_all(&images_dir).map_err(|e| NbpackError::io(&images_dir, e))?;
    let file_name = format!("sample_output_cell{}_{}.{}", cell_index, counter, extension);
    let path = images_dir.join(&file_name);
    fs::write(&path, &bytes).map_err(|e| NbpackError::io(&path, e))?;

    let relative = format!("{}/{}", IMAGES_DIR, file_name);
    log::info!("Extracted image: {} ({} bytes)", relative, bytes.len());
    Ok(Some(ExtractedImage::new(cell_index, bytes.len() as u64, relative)))
}

fn save_notebook(nb: &Notebook, original: &Path, package_dir: &Path) -> Result<()> {
    let orig_path = package_dir.join(NOTEBOOK_ORIG_FILE_NAME);
    if original.is_file() {
        fs::copy(original, &orig_path).map_err(|e| NbpackError::io(&orig_path, e))?;
    }
    let cleaned = package_dir.join(NOTEBOOK_FILE_NAME);
    write_notebook(nb, &cleaned)?;
    log::info!("Saved cleaned notebook: {}", cleaned.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    // 1x1 transparent PNG
    const PNG_B64: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn preprocessor() -> NotebookPreprocessor {
        NotebookPreprocessor::new(CompiledRules::builtin().unwrap()).unwrap()
    }

    fn write_nb(dir: &Path, cells: Value) -> std::path::PathBuf {
        let path = dir.join("hw.ipynb");
        let nb = json!({
            "cells": cells,
            "metadata": {"kernelspec": {"name": "python3", "display_name": "Python 3"}},
            "nbformat": 4,
            "nbformat_minor": 5
        });
        fs::write(&path, serde_json::to_string(&nb).unwrap()).unwrap();
        path
    }

    fn code(source: &str) -> Value {
        json!({"cell_type": "code", "metadata": {}, "execution_count": null, "outputs": [], "source": source})
    }

    fn markdown(source: &str) -> Value {
        json!({"cell_type": "markdown", "metadata": {}, "source": source})
    }

    #[test]
    fn test_markers_one_code_one_markdown() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_nb(
            dir.path(),
            json!([code("# TODO: implement\n"), markdown("**Your answer here:**"), code("x = 1")]),
        );
        let mut log = TransformationLog::new();

        let result = preprocessor().preprocess(&path, dir.path(), &mut log).unwrap();
        let markers = &result.analysis.todo_markers;

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].cell_index, 0);
        assert_eq!(markers[0].cell_type, CellType::Code);
        assert_eq!(markers[1].cell_index, 1);
        assert_eq!(markers[1].cell_type, CellType::Markdown);
        assert_eq!(result.analysis.total_cells, 3);
        assert_eq!(result.analysis.cell_type_counts["code"], 2);
        assert_eq!(result.analysis.kernel_spec.as_deref(), Some("python3"));
    }

    #[test]
    fn test_first_pattern_wins_and_variable_name() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_nb(
            dir.path(),
            json!([code("## Task 3b\nprompt = \"\"  # TODO fill in\nraise NotImplementedError")]),
        );
        let mut log = TransformationLog::new();

        let result = preprocessor().preprocess(&path, dir.path(), &mut log).unwrap();
        let marker = &result.analysis.todo_markers[0];

        assert_eq!(result.analysis.todo_markers.len(), 1);
        assert_eq!(marker.marker_pattern, r"#\s*TODO");
        assert_eq!(marker.variable_name.as_deref(), Some("prompt"));
        assert_eq!(marker.task_id.as_deref(), Some("3b"));
    }

    #[test]
    fn test_dependencies_exclude_stdlib() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_nb(
            dir.path(),
            json!([code("import os\nimport json\nimport pandas as pd\nfrom openai import OpenAI\n")]),
        );
        let mut log = TransformationLog::new();

        let analysis = preprocessor().preprocess(&path, dir.path(), &mut log).unwrap().analysis;

        assert_eq!(analysis.dependencies, vec!["openai", "pandas"]);
        assert_eq!(analysis.api_dependencies, vec!["openai"]);
    }

    #[test]
    fn test_hardcoded_paths_not_deduplicated() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_nb(
            dir.path(),
            json!([code("a = pd.read_csv('emails.csv')\nb = pd.read_csv('emails.csv')\nc = '/path/to/model'")]),
        );
        let mut log = TransformationLog::new();

        let analysis = preprocessor().preprocess(&path, dir.path(), &mut log).unwrap().analysis;

        assert_eq!(analysis.hardcoded_paths, vec!["emails.csv", "emails.csv", "/path/to/model"]);
    }

    #[test]
    fn test_output_image_extracted() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let cell = json!({
            "cell_type": "code", "metadata": {}, "execution_count": 1, "source": "plot()",
            "outputs": [
                {"output_type": "display_data", "metadata": {}, "data": {"image/png": PNG_B64}},
                {"output_type": "execute_result", "metadata": {}, "execution_count": 1,
                 "data": {"image/png": PNG_B64, "text/plain": "<Figure>"}}
            ]
        });
        let path = write_nb(dir.path(), json!([cell]));
        let mut log = TransformationLog::new();

        let result = preprocessor().preprocess(&path, dir.path(), &mut log).unwrap();

        assert_eq!(result.images.len(), 2);
        assert_eq!(result.images[0].extracted_path, "images/sample_output_cell0_0.png");
        assert_eq!(result.images[1].extracted_path, "images/sample_output_cell0_1.png");
        assert!(dir.path().join("images/sample_output_cell0_1.png").is_file());
        assert_eq!(result.analysis.embedded_images_count, 2);

        let cleaned = read_notebook(&dir.path().join(NOTEBOOK_FILE_NAME)).unwrap();
        let outputs = cleaned.cells[0].outputs.as_ref().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0]["data"], json!({"text/plain": "<Figure>"}));

        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].records_affected, 2);
        assert_eq!(
            fs::read(dir.path().join(NOTEBOOK_ORIG_FILE_NAME)).unwrap(),
            fs::read(&path).unwrap()
        );
    }

    #[test]
    fn test_markdown_image_rewritten() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let source = format!("Expected:\n![](data:image/png;base64,{})\nend", PNG_B64);
        let path = write_nb(dir.path(), json!([markdown(&source)]));
        let mut log = TransformationLog::new();

        let result = preprocessor().preprocess(&path, dir.path(), &mut log).unwrap();

        let cleaned = read_notebook(&dir.path().join(NOTEBOOK_FILE_NAME)).unwrap();
        assert_eq!(
            cleaned.cells[0].source,
            "Expected:\n![Sample Output](images/sample_output_cell0_0.png)\nend"
        );
        assert_eq!(result.images[0].cell_index, 0);
    }

    #[test]
    fn test_malformed_markdown_payload_left_alone() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let source = "![x](data:image/png;base64,abc)";
        let path = write_nb(dir.path(), json!([markdown(source)]));
        let mut log = TransformationLog::new();

        let result = preprocessor().preprocess(&path, dir.path(), &mut log).unwrap();

        assert!(result.images.is_empty());
        assert!(log.entries().is_empty());
        assert!(!dir.path().join(IMAGES_DIR).exists());
        let cleaned = read_notebook(&dir.path().join(NOTEBOOK_FILE_NAME)).unwrap();
        assert_eq!(cleaned.cells[0].source, source);
    }
}
