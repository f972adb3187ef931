//! Instruction improvement hook.
//!
//! Reserved extension point: a content-generating implementation would merge
//! notebook prose with the instruction file, flag vague steps and map rubric
//! criteria. The built-in improver proposes nothing.

use crate::manifest::InstructionImprovement;
use crate::models::NotebookAnalysis;
use std::path::Path;

/// Suggests instruction improvements for a package.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionImprover;

impl InstructionImprover {
    /// Create an improver.
    pub fn new() -> Self {
        InstructionImprover
    }

    /// Suggest improvements. Always empty.
    pub fn improve(
        &self,
        analysis: &NotebookAnalysis,
        instructions_path: Option<&Path>,
        rubric: Option<&str>,
    ) -> Vec<InstructionImprovement> {
        log::debug!(
            "Instruction improvement skipped: {} cell(s), instructions={}, rubric={}",
            analysis.total_cells,
            instructions_path.map(|p| p.display().to_string()).unwrap_or_else(|| "none".to_string()),
            if rubric.is_some() { "provided" } else { "none" }
        );
        Vec::new()
    }
}
