//! nbpack error types.
//!
//! All errors are typed and provide root cause information.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for nbpack operations.
#[derive(Error, Debug)]
pub enum NbpackError {
    /// I/O error during file operations.
    #[error("I/O error for path {path}: {source}")]
    Io {
        /// The file path that caused the I/O error.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A required directory, document or run does not exist.
    #[error("{what} not found: {path}")]
    NotFound {
        /// What was being looked up (e.g. "Source directory").
        what: String,
        /// The path that was searched.
        path: PathBuf,
    },

    /// Refusing to overwrite existing content without an explicit force.
    #[error("Conflict at {path}: {message}")]
    Conflict {
        /// The directory that is already populated.
        path: PathBuf,
        /// What would have been clobbered.
        message: String,
    },

    /// Notebook execution failed (kernel error, user code error or timeout).
    #[error("Notebook execution failed: {0}")]
    Execution(String),

    /// HTML export failed.
    #[error("Export failed for {path}: {message}")]
    Export {
        /// The notebook being exported.
        path: PathBuf,
        /// The renderer's error output.
        message: String,
    },

    /// External tool not available on PATH.
    #[error("{tool} not found on PATH")]
    ToolNotAvailable {
        /// The binary that was looked up.
        tool: String,
    },

    /// Notebook document could not be parsed.
    #[error("Invalid notebook {path}: {message}")]
    InvalidNotebook {
        /// The notebook file.
        path: PathBuf,
        /// The parse error message.
        message: String,
    },

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// The parse error message.
        message: String,
    },

    /// A persisted checkpoint or manifest could not be parsed.
    #[error("Invalid state file {path}: {message}")]
    InvalidState {
        /// The JSON document.
        path: PathBuf,
        /// The parse error message.
        message: String,
    },

    /// A detection rule failed to compile.
    #[error("Invalid detection pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Pipeline step failed.
    #[error("Pipeline step '{step}' failed: {source}")]
    StepFailed {
        /// The step name.
        step: String,
        /// The error raised by the step.
        #[source]
        source: Box<NbpackError>,
    },

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl NbpackError {
    /// Build a `NotFound` error.
    pub fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        NbpackError::NotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NbpackError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for NbpackError {
    fn from(err: std::io::Error) -> Self {
        NbpackError::Io {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

/// Result type alias for nbpack operations.
pub type Result<T> = std::result::Result<T, NbpackError>;
