//! Canonical project folder layout.
//!
//! ```text
//! root/
//! ├── input/       originals
//! ├── ingested/    normalized package
//! └── output/
//!     ├── run-001/ auto-numbered runs
//!     └── custom/  named runs
//! ```
//!
//! A path named `input` resolves to its parent as the root.

use crate::config::CONFIG_FILE_NAME;
use crate::error::{NbpackError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const INPUT_DIR: &str = "input";
const INGESTED_DIR: &str = "ingested";
const OUTPUT_DIR: &str = "output";
const RUN_PATTERN: &str = r"^run-(\d{3,})$";

/// Resolves and manages the project directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Layout rooted at `path`, or at its parent when `path` is `input/`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let root = match (path.file_name(), path.parent()) {
            (Some(name), Some(parent)) if name == INPUT_DIR => parent.to_path_buf(),
            _ => path,
        };
        ProjectLayout { root }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root/input`.
    pub fn input_dir(&self) -> PathBuf {
        self.root.join(INPUT_DIR)
    }

    /// `root/ingested`.
    pub fn ingested_dir(&self) -> PathBuf {
        self.root.join(INGESTED_DIR)
    }

    /// `root/output`.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    /// Directory for a run: the given name, or the next `run-NNN`.
    pub fn run_dir(&self, name: Option<&str>) -> Result<PathBuf> {
        match name {
            Some(name) => Ok(self.output_dir().join(name)),
            None => Ok(self.output_dir().join(self.next_run_name()?)),
        }
    }

    /// One past the highest existing `run-NNN`; other names are ignored.
    pub fn next_run_name(&self) -> Result<String> {
        let max = self.numbered_runs()?.into_iter().map(|(n, _)| n).max().unwrap_or(0);
        Ok(format!("run-{:03}", max + 1))
    }

    /// The highest-numbered `run-NNN` directory, if any.
    pub fn latest_run_dir(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .numbered_runs()?
            .into_iter()
            .max_by_key(|(n, _)| *n)
            .map(|(_, path)| path))
    }

    fn numbered_runs(&self) -> Result<Vec<(u64, PathBuf)>> {
        let output = self.output_dir();
        if !output.is_dir() {
            return Ok(Vec::new());
        }
        let pattern = Regex::new(RUN_PATTERN)?;
        let mut runs = Vec::new();
        for entry in fs::read_dir(&output).map_err(|e| NbpackError::io(&output, e))? {
            let entry = entry.map_err(|e| NbpackError::io(&output, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let number = pattern
                .captures(&name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok());
            if let Some(n) = number {
                runs.push((n, path));
            }
        }
        Ok(runs)
    }

    /// Root entries outside `input/`, `ingested/`, `output/` and the config file, sorted.
    pub fn loose_entries(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| NbpackError::io(&self.root, e))? {
            let entry = entry.map_err(|e| NbpackError::io(&self.root, e))?;
            let name = entry.file_name();
            let reserved = [INPUT_DIR, INGESTED_DIR, OUTPUT_DIR, CONFIG_FILE_NAME]
                .iter()
                .any(|r| name == *r);
            if !reserved {
                entries.push(entry.path());
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Whether the root holds anything outside the canonical layout.
    pub fn has_loose_files(&self) -> Result<bool> {
        Ok(!self.loose_entries()?.is_empty())
    }

    /// Whether `input/` has any content.
    pub fn input_already_populated(&self) -> Result<bool> {
        let input = self.input_dir();
        if !input.is_dir() {
            return Ok(false);
        }
        let mut entries = fs::read_dir(&input).map_err(|e| NbpackError::io(&input, e))?;
        Ok(entries.next().is_some())
    }

    /// Create `input/`, `ingested/` and `output/` if absent.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.input_dir(), self.ingested_dir(), self.output_dir()] {
            fs::create_dir_all(&dir).map_err(|e| NbpackError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Move loose root entries into `input/`.
    ///
    /// Refuses with `Conflict` when `input/` already has content, unless
    /// `force` is set. With `force`, same-named entries in `input/` are replaced.
    pub fn move_loose_files(&self, force: bool) -> Result<usize> {
        let loose = self.loose_entries()?;
        if loose.is_empty() {
            return Ok(0);
        }
        let input = self.input_dir();
        if self.input_already_populated()? && !force {
            return Err(NbpackError::Conflict {
                path: input,
                message: format!(
                    "{} loose file(s) at the project root but input/ is already populated; use --force to move them anyway",
                    loose.len()
                ),
            });
        }

        fs::create_dir_all(&input).map_err(|e| NbpackError::io(&input, e))?;
        for src in &loose {
            let Some(name) = src.file_name() else {
                continue;
            };
            let dst = input.join(name);
            if dst.is_dir() {
                fs::remove_dir_all(&dst).map_err(|e| NbpackError::io(&dst, e))?;
            } else if dst.exists() {
                fs::remove_file(&dst).map_err(|e| NbpackError::io(&dst, e))?;
            }
            fs::rename(src, &dst).map_err(|e| NbpackError::io(src, e))?;
            log::debug!("Moved {} -> {}", src.display(), dst.display());
        }
        log::info!("Moved {} loose file(s) into {}", loose.len(), input.display());
        Ok(loose.len())
    }
}
