//! Pluggable completion strategies.
//!
//! A [`Solver`] fills in cells the parser flagged as needing work. The
//! pipeline only depends on this trait; [`StubSolver`] and [`ManualSolver`]
//! are reference implementations.

use crate::error::{NbpackError, Result};
use crate::models::{CellStatus, NotebookCell, NotebookContent};
use std::io::{self, BufRead, Write};

/// Completes marker-flagged notebook cells.
pub trait Solver {
    /// Completed source for a `todo_code` cell.
    fn solve_code_cell(&mut self, cell: &NotebookCell, context: &NotebookContent) -> Result<String>;

    /// Answer text for a `todo_markdown` cell.
    fn solve_markdown_cell(&mut self, cell: &NotebookCell, context: &NotebookContent) -> Result<String>;

    /// Solve every todo cell, keeping each cell's prior source.
    fn solve(&mut self, content: &NotebookContent) -> Result<NotebookContent> {
        let mut solved = content.clone();
        for (i, cell) in content.cells.iter().enumerate() {
            let new_source = match cell.status {
                CellStatus::TodoCode => self.solve_code_cell(cell, content)?,
                CellStatus::TodoMarkdown => self.solve_markdown_cell(cell, content)?,
                _ => continue,
            };
            let target = &mut solved.cells[i];
            target.original_source = Some(std::mem::replace(&mut target.source, new_source));
            target.status = CellStatus::Completed;
            log::debug!("Solved cell {}", cell.index);
        }
        Ok(solved)
    }
}

/// Deterministic placeholder answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubSolver;

impl StubSolver {
    /// Placeholder code.
    pub const CODE: &'static str = "# Stub solution\npass";
    /// Placeholder markdown.
    pub const MARKDOWN: &'static str = "Stub answer: This is a placeholder response.";
}

impl Solver for StubSolver {
    fn solve_code_cell(&mut self, _cell: &NotebookCell, _context: &NotebookContent) -> Result<String> {
        Ok(Self::CODE.to_string())
    }

    fn solve_markdown_cell(&mut self, _cell: &NotebookCell, _context: &NotebookContent) -> Result<String> {
        Ok(Self::MARKDOWN.to_string())
    }
}

/// Interactive solver: shows each cell and reads an answer terminated by a
/// blank line.
#[derive(Debug)]
pub struct ManualSolver<R, W> {
    input: R,
    output: W,
}

impl ManualSolver<io::StdinLock<'static>, io::Stdout> {
    /// Solver bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        ManualSolver::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ManualSolver<R, W> {
    /// Solver reading from `input` and prompting on `output`.
    pub fn new(input: R, output: W) -> Self {
        ManualSolver { input, output }
    }

    fn prompt(&mut self, kind: &str, cell: &NotebookCell, ask: &str) -> Result<String> {
        writeln!(self.output, "\n--- {} Cell {} ---", kind, cell.index)?;
        writeln!(self.output, "{}", cell.source)?;
        writeln!(self.output, "---")?;
        writeln!(self.output, "{} (end with an empty line):", ask)?;
        self.output.flush()?;
        self.read_multiline()
    }

    fn read_multiline(&mut self) -> Result<String> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let read = self.input.read_line(&mut line).map_err(NbpackError::from)?;
            let line = line.trim_end_matches(['\r', '\n']);
            if read == 0 || line.is_empty() {
                break;
            }
            lines.push(line.to_string());
        }
        Ok(lines.join("\n"))
    }
}

impl<R: BufRead, W: Write> Solver for ManualSolver<R, W> {
    fn solve_code_cell(&mut self, cell: &NotebookCell, _context: &NotebookContent) -> Result<String> {
        self.prompt("Code", cell, "Enter your solution")
    }

    fn solve_markdown_cell(&mut self, cell: &NotebookCell, _context: &NotebookContent) -> Result<String> {
        self.prompt("Markdown", cell, "Enter your answer")
    }
}
