//! Command-line interface for nbpack.
//!
//! This module handles argument parsing and user interface only.
//! Ingestion and processing logic lives in the library modules.

use crate::models::{CellStatus, NotebookContent};
use crate::solver::{ManualSolver, Solver, StubSolver};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// nbpack: normalize assignment notebooks and complete them in resumable runs.
#[derive(Parser, Debug)]
#[command(name = "nbpack")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_required = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: nbpack.json at the project root).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available nbpack commands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Ingest a raw assignment folder into a normalized package.
    ///
    /// FOLDER is the project root (or its input/ subdirectory). Loose files
    /// are moved into input/ and the package is written to ingested/.
    Ingest {
        /// Project root.
        folder: PathBuf,

        /// Re-ingest even if a manifest already exists.
        #[arg(long)]
        force: bool,
    },

    /// Run the processing pipeline on an ingested package.
    ///
    /// Reads ingested/ and writes output/<name>.
    Process {
        /// Project root.
        folder: PathBuf,

        /// Run name (default: next run-NNN).
        #[arg(long)]
        name: Option<String>,

        /// Completion strategy.
        #[arg(long, value_enum, default_value_t = SolverKind::Stub)]
        solver: SolverKind,
    },

    /// Ingest and then process in one step.
    Run {
        /// Project root.
        folder: PathBuf,

        /// Run name (default: next run-NNN).
        #[arg(long)]
        name: Option<String>,

        /// Re-ingest even if a manifest already exists.
        #[arg(long)]
        force: bool,

        /// Completion strategy.
        #[arg(long, value_enum, default_value_t = SolverKind::Stub)]
        solver: SolverKind,
    },

    /// Re-embed original outputs into a completed run and export it.
    Validate {
        /// Project root.
        folder: PathBuf,

        /// Run name (default: latest run-NNN).
        #[arg(long)]
        name: Option<String>,
    },

    /// Parse a notebook directory and print a JSON summary.
    Parse {
        /// Directory containing the notebook.
        input_dir: PathBuf,
    },

    /// Execute a notebook in place.
    Execute {
        /// Notebook to execute.
        notebook: PathBuf,

        /// Timeout per cell in seconds.
        #[arg(short, long, default_value_t = 600)]
        timeout: u64,

        /// Kernel name.
        #[arg(short, long)]
        kernel: Option<String>,
    },

    /// Export a notebook to HTML.
    Export {
        /// Notebook to export.
        notebook: PathBuf,

        /// Output file (default: next to the notebook).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Completion strategy selectable on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Deterministic placeholder answers.
    Stub,
    /// Prompt for each answer on stdin.
    Manual,
}

impl SolverKind {
    /// Instantiate the solver.
    pub fn build(self) -> Box<dyn Solver> {
        match self {
            SolverKind::Stub => Box::new(StubSolver),
            SolverKind::Manual => Box::new(ManualSolver::stdio()),
        }
    }
}

/// Parse arguments from the process command line.
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Output of the `parse` command.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ParseSummary {
    /// The notebook that was parsed.
    pub path: PathBuf,
    /// Total cells.
    pub num_cells: usize,
    /// Code cells awaiting a solution.
    pub todo_code: usize,
    /// Markdown cells awaiting an answer.
    pub todo_markdown: usize,
    /// Kernel name, if declared.
    pub kernel_spec: Option<String>,
    /// Whether `instructions.md` was found.
    pub has_instructions: bool,
}

impl ParseSummary {
    /// Summarize parsed content.
    pub fn from_content(content: &NotebookContent) -> Self {
        let count = |status| content.cells.iter().filter(|c| c.status == status).count();
        ParseSummary {
            path: content.path.clone(),
            num_cells: content.cells.len(),
            todo_code: count(CellStatus::TodoCode),
            todo_markdown: count(CellStatus::TodoMarkdown),
            kernel_spec: content.kernel_spec.clone(),
            has_instructions: content.instructions.is_some(),
        }
    }
}
