//! nbpack CLI binary
//!
//! The CLI is a thin adapter over the library APIs; no ingestion or
//! processing logic is implemented here.

use nbpack::benchmark::CommandBenchmarkBridge;
use nbpack::cli::{Commands, ParseSummary, SolverKind};
use nbpack::config::Config;
use nbpack::execute::{Executor, NbconvertExecutor};
use nbpack::export::{Exporter, NbconvertExporter};
use nbpack::layout::ProjectLayout;
use nbpack::manifest::{PackageManifest, MANIFEST_FILE_NAME};
use nbpack::parse::NotebookParser;
use nbpack::pipeline::{PipelineState, Step};
use nbpack::reembed::validate_run;
use nbpack::{Ingestor, NbpackError, ProcessingPipeline, Result};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let cli = nbpack::cli::parse_args();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Ingest { folder, force } => execute_ingest(&folder, force, config_path),
        Commands::Process { folder, name, solver } => {
            execute_process(&folder, name.as_deref(), solver, config_path)
        }
        Commands::Run {
            folder,
            name,
            force,
            solver,
        } => execute_ingest(&folder, force, config_path).and_then(|ingested| {
            execute_process(&folder, name.as_deref(), solver, config_path)
                .map(|processed| format!("{}\n{}", ingested, processed))
        }),
        Commands::Validate { folder, name } => execute_validate(&folder, name.as_deref(), config_path),
        Commands::Parse { input_dir } => execute_parse(&input_dir, config_path),
        Commands::Execute {
            notebook,
            timeout,
            kernel,
        } => execute_notebook(&notebook, timeout, kernel.as_deref(), config_path),
        Commands::Export { notebook, output } => execute_export(&notebook, output.as_deref(), config_path),
    };

    match result {
        Ok(msg) => {
            println!("{}", msg);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Resolve the project layout for an existing folder.
fn open_layout(folder: &Path) -> Result<ProjectLayout> {
    if !folder.exists() {
        return Err(NbpackError::not_found("Project folder", folder));
    }
    Ok(ProjectLayout::new(folder))
}

/// `--config` if given, else `nbpack.json` under `root`, else defaults.
fn load_config(explicit: Option<&Path>, root: Option<&Path>) -> Result<Config> {
    match (explicit, root) {
        (Some(path), _) => Config::load(path),
        (None, Some(root)) => Config::load_or_default(root),
        (None, None) => Ok(Config::default()),
    }
}

/// Execute the ingest command.
fn execute_ingest(folder: &Path, force: bool, config_path: Option<&Path>) -> Result<String> {
    let layout = open_layout(folder)?;
    let config = load_config(config_path, Some(layout.root()))?;
    let ingestor = Ingestor::with_rules(config.detection.compile()?)?;

    log::info!("Ingesting: {}", layout.root().display());
    let manifest = ingestor.ingest_project(&layout, force)?;
    Ok(describe_manifest(&manifest, &layout.ingested_dir().join(MANIFEST_FILE_NAME)))
}

fn describe_manifest(manifest: &PackageManifest, manifest_path: &Path) -> String {
    let mut lines = vec![format!("Assets: {} files", manifest.assets.len())];
    if let Some(analysis) = &manifest.notebook.analysis {
        lines.push(format!("TODO markers: {}", analysis.todo_markers.len()));
        lines.push(format!("Images extracted: {}", analysis.embedded_images_count));
        let deps = if analysis.dependencies.is_empty() {
            "none".to_string()
        } else {
            analysis.dependencies.join(", ")
        };
        lines.push(format!("Dependencies: {}", deps));
    }
    lines.push(format!("Manifest: {}", manifest_path.display()));
    lines.join("\n")
}

/// Execute the process command.
fn execute_process(
    folder: &Path,
    name: Option<&str>,
    solver: SolverKind,
    config_path: Option<&Path>,
) -> Result<String> {
    let layout = open_layout(folder)?;
    let config = load_config(config_path, Some(layout.root()))?;
    let rules = config.detection.compile()?;
    let mut pipeline = ProcessingPipeline::with_nbconvert(config.processing)?.with_rules(&rules);
    if let Some(bridge) = CommandBenchmarkBridge::detect() {
        pipeline = pipeline.with_benchmark(Box::new(bridge));
    }

    let mut solver = solver.build();
    let state = pipeline.run_project(&layout, name, solver.as_mut())?;
    Ok(describe_state(&state))
}

fn describe_state(state: &PipelineState) -> String {
    let steps: Vec<&str> = state.completed_steps.iter().map(Step::as_str).collect();
    let mut lines = vec![
        format!("Completed steps: {}", steps.join(", ")),
        format!("Output: {}", state.output_path.display()),
    ];
    if !state.errors.is_empty() {
        lines.push(format!("Errors: {}", state.errors.join("; ")));
    }
    lines.join("\n")
}

/// Execute the validate command.
fn execute_validate(folder: &Path, name: Option<&str>, config_path: Option<&Path>) -> Result<String> {
    let layout = open_layout(folder)?;
    let config = load_config(config_path, Some(layout.root()))?;
    let exporter = NbconvertExporter::new(config.processing.jupyter);

    let report = validate_run(&layout, name, &exporter)?;
    Ok(format!(
        "Validated notebook: {}\nHTML export: {}\nRestored cells: {}",
        report.notebook.display(),
        report.html.display(),
        report.restored
    ))
}

/// Execute the parse command.
fn execute_parse(input_dir: &Path, config_path: Option<&Path>) -> Result<String> {
    let config = load_config(config_path, None)?;
    let parser = NotebookParser::new(&config.detection.compile()?);
    let content = parser.parse(input_dir)?;
    serde_json::to_string_pretty(&ParseSummary::from_content(&content))
        .map_err(|e| NbpackError::Other(format!("Failed to serialize summary: {}", e)))
}

/// Execute the execute command.
fn execute_notebook(notebook: &Path, timeout: u64, kernel: Option<&str>, config_path: Option<&Path>) -> Result<String> {
    let config = load_config(config_path, None)?;
    let executor = NbconvertExecutor::new(config.processing.jupyter);
    executor.execute(notebook, Duration::from_secs(timeout), kernel)?;
    Ok(format!("Executed: {}", notebook.display()))
}

/// Execute the export command.
fn execute_export(notebook: &Path, output: Option<&Path>, config_path: Option<&Path>) -> Result<String> {
    let config = load_config(config_path, None)?;
    let exporter = NbconvertExporter::new(config.processing.jupyter);
    let written: PathBuf = exporter.export_html(notebook, output)?;
    Ok(format!("Exported (html): {}", written.display()))
}
