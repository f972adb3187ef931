//! Checkpoint persisted between pipeline steps.

use crate::error::{NbpackError, Result};
use crate::fsutil::write_json_atomic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Checkpoint file name inside the output directory.
pub const STATE_FILE_NAME: &str = "state.json";

/// One pipeline step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Read the notebook and classify cells.
    Parse,
    /// Complete todo cells.
    Solve,
    /// Write the completed notebook document.
    Build,
    /// Run it against a kernel.
    Execute,
    /// Render HTML.
    Export,
    /// Copy inputs to the done location.
    Archive,
}

impl Step {
    /// Every step, in order.
    pub const ALL: [Step; 6] = [
        Step::Parse,
        Step::Solve,
        Step::Build,
        Step::Execute,
        Step::Export,
        Step::Archive,
    ];

    /// Lowercase name as stored in `state.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Parse => "parse",
            Step::Solve => "solve",
            Step::Build => "build",
            Step::Execute => "execute",
            Step::Export => "export",
            Step::Archive => "archive",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Input directory.
    pub input_path: PathBuf,
    /// Output directory; `state.json` lives here.
    pub output_path: PathBuf,
    /// Archive destination, if any.
    #[serde(default)]
    pub done_path: Option<PathBuf>,
    /// Step most recently started.
    pub current_step: Step,
    /// Steps finished, in completion order, without duplicates.
    #[serde(default)]
    pub completed_steps: Vec<Step>,
    /// Recorded failures, oldest first.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PipelineState {
    /// Fresh state positioned at `parse`.
    pub fn new(input: &Path, output: &Path, done: Option<&Path>) -> Self {
        PipelineState {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            done_path: done.map(Path::to_path_buf),
            current_step: Step::Parse,
            completed_steps: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Path of the checkpoint file for `output_dir`.
    pub fn file_path(output_dir: &Path) -> PathBuf {
        output_dir.join(STATE_FILE_NAME)
    }

    /// Load `output_dir/state.json`.
    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = Self::file_path(output_dir);
        let content = fs::read_to_string(&path).map_err(|e| NbpackError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| NbpackError::InvalidState {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    /// Resume from an existing checkpoint, or start fresh when there is none.
    ///
    /// On resume a `done` location replaces the saved one; `None` keeps it.
    pub fn load_or_create(input: &Path, output: &Path, done: Option<&Path>) -> Result<Self> {
        if Self::file_path(output).is_file() {
            let mut state = Self::load(output)?;
            state.output_path = output.to_path_buf();
            if let Some(done) = done {
                state.done_path = Some(done.to_path_buf());
            }
            log::info!(
                "Resuming pipeline; completed steps: [{}]",
                state
                    .completed_steps
                    .iter()
                    .map(Step::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            Ok(state)
        } else {
            Ok(Self::new(input, output, done))
        }
    }

    /// Write the checkpoint atomically to `output_path/state.json`.
    pub fn save(&self) -> Result<()> {
        write_json_atomic(&Self::file_path(&self.output_path), self)
    }

    /// Whether `step` already finished.
    pub fn is_complete(&self, step: Step) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Record `step` as finished.
    pub fn mark_complete(&mut self, step: Step) {
        if !self.is_complete(step) {
            self.completed_steps.push(step);
        }
    }

    /// Whether every step finished.
    pub fn is_finished(&self) -> bool {
        Step::ALL.iter().all(|s| self.is_complete(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_state_round_trip() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut state = PipelineState::new(Path::new("in"), dir.path(), None);
        state.current_step = Step::Execute;
        state.mark_complete(Step::Parse);
        state.mark_complete(Step::Solve);
        state.mark_complete(Step::Parse);
        state.errors.push("boom".to_string());
        state.save().unwrap();

        let loaded = PipelineState::load(dir.path()).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.completed_steps, vec![Step::Parse, Step::Solve]);
        assert!(!loaded.is_finished());
    }

    #[test]
    fn test_state_json_shape() {
        let state = PipelineState::new(Path::new("in"), Path::new("out"), Some(Path::new("done")));
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["current_step"], json!("parse"));
        assert_eq!(value["done_path"], json!("done"));
        assert_eq!(value["completed_steps"], json!([]));
    }

    #[test]
    fn test_load_or_create_fresh() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let state = PipelineState::load_or_create(Path::new("in"), dir.path(), None).unwrap();
        assert_eq!(state.current_step, Step::Parse);
        assert!(state.completed_steps.is_empty());
    }

    #[test]
    fn test_resume_keeps_saved_done_path() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        PipelineState::new(Path::new("in"), dir.path(), Some(Path::new("done")))
            .save()
            .unwrap();

        let kept = PipelineState::load_or_create(Path::new("in"), dir.path(), None).unwrap();
        assert_eq!(kept.done_path, Some(PathBuf::from("done")));

        let replaced =
            PipelineState::load_or_create(Path::new("in"), dir.path(), Some(Path::new("elsewhere"))).unwrap();
        assert_eq!(replaced.done_path, Some(PathBuf::from("elsewhere")));
    }

    #[test]
    fn test_corrupt_state_is_invalid_state() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join(STATE_FILE_NAME), "{not json").unwrap();
        let result = PipelineState::load_or_create(Path::new("in"), dir.path(), None);
        assert!(matches!(result, Err(NbpackError::InvalidState { .. })));
    }
}
