//! Resumable processing pipeline.
//!
//! Steps run in [`Step::ALL`] order against a [`PipelineState`] checkpoint in
//! the output directory. A step already listed as complete is skipped, and
//! every completion is flushed to `state.json` before the next step starts,
//! so an interrupted or failed run picks up where it stopped.

pub mod state;

pub use state::{PipelineState, Step, STATE_FILE_NAME};

use crate::archive::archive;
use crate::benchmark::BenchmarkBridge;
use crate::build::NotebookBuilder;
use crate::config::{CompiledRules, ProcessingConfig};
use crate::error::{NbpackError, Result};
use crate::execute::{Executor, NbconvertExecutor};
use crate::export::{Exporter, NbconvertExporter};
use crate::fsutil::write_json_atomic;
use crate::layout::ProjectLayout;
use crate::models::NotebookContent;
use crate::parse::NotebookParser;
use crate::solver::Solver;
use std::fs;
use std::path::{Path, PathBuf};

/// Solved content checkpoint inside the output directory.
pub const SOLVED_FILE_NAME: &str = "solved.json";

/// Drives `parse → solve → build → execute → export → archive`.
pub struct ProcessingPipeline {
    parser: NotebookParser,
    builder: NotebookBuilder,
    executor: Box<dyn Executor>,
    exporter: Box<dyn Exporter>,
    config: ProcessingConfig,
    benchmark: Option<Box<dyn BenchmarkBridge>>,
}

impl ProcessingPipeline {
    /// Pipeline with the built-in detection rules and default settings.
    pub fn new(executor: Box<dyn Executor>, exporter: Box<dyn Exporter>) -> Result<Self> {
        let rules = CompiledRules::builtin()?;
        Ok(ProcessingPipeline {
            parser: NotebookParser::new(&rules),
            builder: NotebookBuilder::new(),
            executor,
            exporter,
            config: ProcessingConfig::default(),
            benchmark: None,
        })
    }

    /// Pipeline backed by `jupyter nbconvert` for execution and export.
    pub fn with_nbconvert(config: ProcessingConfig) -> Result<Self> {
        let executor = NbconvertExecutor::new(config.jupyter.clone());
        let exporter = NbconvertExporter::new(config.jupyter.clone());
        Ok(Self::new(Box::new(executor), Box::new(exporter))?.with_config(config))
    }

    /// Replace timeout/kernel settings.
    pub fn with_config(mut self, config: ProcessingConfig) -> Self {
        self.config = config;
        self
    }

    /// Use custom marker detection rules.
    pub fn with_rules(mut self, rules: &CompiledRules) -> Self {
        self.parser = NotebookParser::new(rules);
        self
    }

    /// Run `bridge` after every successful run.
    pub fn with_benchmark(mut self, bridge: Box<dyn BenchmarkBridge>) -> Self {
        self.benchmark = Some(bridge);
        self
    }

    /// Process `input` into `output`, resuming from `output/state.json`.
    ///
    /// `done` is the archive destination; when resuming without one the
    /// location saved in the checkpoint is used.
    ///
    /// On failure the error is appended to the state's `errors`, the state is
    /// saved, and [`NbpackError::StepFailed`] is returned.
    pub fn run(
        &self,
        input: &Path,
        output: &Path,
        done: Option<&Path>,
        solver: &mut dyn Solver,
    ) -> Result<PipelineState> {
        fs::create_dir_all(output).map_err(|e| NbpackError::io(output, e))?;
        let mut state = PipelineState::load_or_create(input, output, done)?;

        if let Err(e) = self.run_steps(&mut state, input, output, solver) {
            let step = state.current_step;
            log::error!("Pipeline failed at step '{}': {}", step, e);
            state.errors.push(e.to_string());
            state.save()?;
            return Err(NbpackError::StepFailed {
                step: step.to_string(),
                source: Box::new(e),
            });
        }

        state.save()?;
        log::info!("Pipeline completed successfully");
        self.run_benchmark(input, output);
        Ok(state)
    }

    /// Process a project's `ingested/` package into a run directory.
    ///
    /// `name` selects (or creates) `output/<name>`; otherwise the next
    /// `run-NNN` is used.
    pub fn run_project(
        &self,
        layout: &ProjectLayout,
        name: Option<&str>,
        solver: &mut dyn Solver,
    ) -> Result<PipelineState> {
        let input = layout.ingested_dir();
        if !input.is_dir() {
            return Err(NbpackError::not_found("Ingested package", input));
        }
        let run_dir = layout.run_dir(name)?;
        log::info!("Processing into {}", run_dir.display());
        self.run(&input, &run_dir, None, solver)
    }

    fn run_steps(
        &self,
        state: &mut PipelineState,
        input: &Path,
        output: &Path,
        solver: &mut dyn Solver,
    ) -> Result<()> {
        // Parsed content is not persisted, so parse always runs
        state.current_step = Step::Parse;
        let parsed = self.parser.parse(input)?;
        complete(state, Step::Parse)?;

        let content = if state.is_complete(Step::Solve) {
            log::debug!("Skipping solve (already complete)");
            load_solved(output)?.unwrap_or_else(|| {
                log::warn!("{} missing; continuing with unsolved content", SOLVED_FILE_NAME);
                parsed
            })
        } else {
            state.current_step = Step::Solve;
            let solved = solver.solve(&parsed)?;
            write_json_atomic(&output.join(SOLVED_FILE_NAME), &solved)?;
            complete(state, Step::Solve)?;
            solved
        };

        let (notebook, html) = completed_paths(&content, output);

        step(state, Step::Build, || {
            self.builder.build(&content, &notebook).map(drop)
        })?;

        step(state, Step::Execute, || {
            let kernel = self
                .config
                .kernel
                .as_deref()
                .or(content.kernel_spec.as_deref());
            self.executor.execute(&notebook, self.config.timeout(), kernel)
        })?;

        step(state, Step::Export, || {
            self.exporter.export_html(&notebook, Some(&html)).map(drop)
        })?;

        let done = state.done_path.clone();
        step(state, Step::Archive, || match &done {
            Some(done) => {
                let report = archive(input, done)?;
                log::info!(
                    "Archived {} file(s), {} unchanged, to {}",
                    report.copied,
                    report.skipped,
                    done.display()
                );
                Ok(())
            }
            None => {
                log::info!("No done location configured; skipping archive");
                Ok(())
            }
        })
    }

    fn run_benchmark(&self, input: &Path, output: &Path) {
        let Some(bridge) = &self.benchmark else {
            return;
        };
        let result = bridge.setup(input).and_then(|config_dir| match config_dir {
            Some(config_dir) => bridge.run(&config_dir, output),
            None => Ok(None),
        });
        match result {
            Ok(Some(report)) => log::info!("Benchmark report: {}", report.display()),
            Ok(None) => log::debug!("Nothing to benchmark"),
            Err(e) => log::warn!("Benchmark failed: {}", e),
        }
    }
}

/// Run `work` for `step` unless it already completed.
fn step(state: &mut PipelineState, step: Step, work: impl FnOnce() -> Result<()>) -> Result<()> {
    if state.is_complete(step) {
        log::debug!("Skipping {} (already complete)", step);
        return Ok(());
    }
    state.current_step = step;
    work()?;
    complete(state, step)
}

fn complete(state: &mut PipelineState, step: Step) -> Result<()> {
    if state.is_complete(step) {
        return Ok(());
    }
    state.current_step = step;
    state.mark_complete(step);
    state.save()?;
    log::info!("Step complete: {}", step);
    Ok(())
}

fn load_solved(output: &Path) -> Result<Option<NotebookContent>> {
    let path = output.join(SOLVED_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).map_err(|e| NbpackError::io(&path, e))?;
    let solved = serde_json::from_str(&content).map_err(|e| NbpackError::InvalidState {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(Some(solved))
}

/// `<stem>_completed.ipynb` and `<stem>_completed.html` under `output`.
pub fn completed_paths(content: &NotebookContent, output: &Path) -> (PathBuf, PathBuf) {
    let stem = content
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "notebook".to_string());
    (
        output.join(format!("{}_completed.ipynb", stem)),
        output.join(format!("{}_completed.html", stem)),
    )
}
