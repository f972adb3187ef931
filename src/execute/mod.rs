//! Notebook execution against a language kernel.
//!
//! The pipeline only sees the [`Executor`] trait. [`NbconvertExecutor`]
//! shells out to `jupyter nbconvert --execute`, which runs every code cell
//! and writes outputs back into the document in place.

use crate::error::{NbpackError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;
use which::which;

/// Runs a notebook's code cells and stores their outputs in the file.
pub trait Executor {
    /// Execute `notebook` in place. A missing or unstartable runner, kernel
    /// errors, user-code errors and timeouts are all `Execution` errors.
    fn execute(&self, notebook: &Path, timeout: Duration, kernel: Option<&str>) -> Result<()>;
}

/// Executes notebooks with `jupyter nbconvert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbconvertExecutor {
    program: String,
}

impl Default for NbconvertExecutor {
    fn default() -> Self {
        Self::new("jupyter")
    }
}

impl NbconvertExecutor {
    /// Executor using `program` (normally `jupyter`).
    pub fn new(program: impl Into<String>) -> Self {
        NbconvertExecutor { program: program.into() }
    }
}

impl Executor for NbconvertExecutor {
    fn execute(&self, notebook: &Path, timeout: Duration, kernel: Option<&str>) -> Result<()> {
        if !notebook.is_file() {
            return Err(NbpackError::not_found("Notebook", notebook));
        }
        let program = resolve_program(&self.program).map_err(|e| NbpackError::Execution(e.to_string()))?;

        log::info!("Executing notebook: {}", notebook.display());
        let mut command = Command::new(program);
        command
            .args(["nbconvert", "--to", "notebook", "--execute", "--inplace"])
            .arg(format!("--ExecutePreprocessor.timeout={}", timeout.as_secs()));
        if let Some(kernel) = kernel {
            command.arg(format!("--ExecutePreprocessor.kernel_name={}", kernel));
        }
        command.arg(notebook);

        let output = command
            .output()
            .map_err(|e| NbpackError::Execution(format!("Failed to start {}: {}", self.program, e)))?;
        if !output.status.success() {
            let message = failure_message(&output);
            log::error!("Notebook execution failed: {}", message);
            return Err(NbpackError::Execution(message));
        }

        log::info!("Notebook executed successfully: {}", notebook.display());
        Ok(())
    }
}

/// Resolve `program` on PATH.
pub(crate) fn resolve_program(program: &str) -> Result<PathBuf> {
    which(program).map_err(|_| NbpackError::ToolNotAvailable {
        tool: program.to_string(),
    })
}

/// Trimmed stderr (stdout if stderr is empty) plus the exit status.
pub(crate) fn failure_message(output: &Output) -> String {
    let selected = if output.stderr.is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };
    let text = String::from_utf8_lossy(selected).trim().to_string();
    if text.is_empty() {
        format!("exited with {}", output.status)
    } else {
        format!("{} ({})", text, output.status)
    }
}
