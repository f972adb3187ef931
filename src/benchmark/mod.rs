//! Optional bridge to an external benchmark framework.
//!
//! When an input folder carries `iterations/<name>/main.py` directories,
//! [`BenchmarkBridge::setup`] writes a `.benchmark/` configuration describing
//! them and [`BenchmarkBridge::run`] asks the framework to execute the pending
//! runs and produce a Markdown comparison report.

use crate::error::{NbpackError, Result};
use crate::execute::{failure_message, resolve_program};
use crate::fsutil::{write_atomic, write_json_atomic};
use chrono::Utc;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the external framework binary.
pub const BENCHMARK_PROGRAM: &str = "benchmark-framework";
/// Directory under the input folder holding iteration sources.
pub const ITERATIONS_DIR: &str = "iterations";
/// Configuration directory written under the input folder.
pub const CONFIG_DIR: &str = ".benchmark";
/// Report file written to the output directory.
pub const REPORT_FILE_NAME: &str = "comparison_report.md";

const ENTRY_POINT: &str = "main.py";

/// Hook run after a successful pipeline.
pub trait BenchmarkBridge {
    /// Write configuration for `input_dir`; `None` when there is nothing to
    /// benchmark.
    fn setup(&self, input_dir: &Path) -> Result<Option<PathBuf>>;

    /// Execute pending runs from `config_dir` and write a report into
    /// `output_dir`; `None` when there is nothing to run.
    fn run(&self, config_dir: &Path, output_dir: &Path) -> Result<Option<PathBuf>>;
}

/// Bridge driving the `benchmark-framework` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBenchmarkBridge {
    program: PathBuf,
}

impl CommandBenchmarkBridge {
    /// Bridge using a specific binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandBenchmarkBridge {
            program: program.into(),
        }
    }

    /// Bridge for the framework on PATH, if installed.
    pub fn detect() -> Option<Self> {
        match resolve_program(BENCHMARK_PROGRAM) {
            Ok(program) => Some(Self::new(program)),
            Err(_) => {
                log::debug!("{} not installed, skipping", BENCHMARK_PROGRAM);
                None
            }
        }
    }

    fn invoke(&self, args: &[&str], config_dir: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .arg("--config")
            .arg(config_dir)
            .output()
            .map_err(|e| NbpackError::io(&self.program, e))?;
        if !output.status.success() {
            return Err(NbpackError::Other(format!(
                "{} {} failed: {}",
                self.program.display(),
                args.join(" "),
                failure_message(&output)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl BenchmarkBridge for CommandBenchmarkBridge {
    fn setup(&self, input_dir: &Path) -> Result<Option<PathBuf>> {
        let iterations_dir = input_dir.join(ITERATIONS_DIR);
        if !iterations_dir.is_dir() {
            log::debug!("No {}/ directory found, skipping benchmark", ITERATIONS_DIR);
            return Ok(None);
        }
        let iterations = discover_iterations(&iterations_dir)?;
        if iterations.is_empty() {
            return Ok(None);
        }

        let config_dir = input_dir.join(CONFIG_DIR);
        let created_at = Utc::now().to_rfc3339();
        let ids: Vec<Value> = iterations.iter().map(|it| it["id"].clone()).collect();

        write_json_atomic(
            &config_dir.join("iterations.json"),
            &json!({ "project": "notebook-benchmark", "iterations": iterations }),
        )?;
        write_json_atomic(
            &config_dir.join("metrics.json"),
            &json!({
                "metrics": [{
                    "id": "exec_time",
                    "name": "Execution Time",
                    "description": "Wall-clock execution time",
                    "type": "performance",
                    "class": "benchmark_framework.metrics.timing.ExecutionTimeMetric",
                    "higher_is_better": false,
                    "unit": "seconds",
                }]
            }),
        )?;
        write_json_atomic(
            &config_dir.join("runs.json"),
            &json!({
                "runs": [{
                    "id": "run-001",
                    "name": "Notebook comparison",
                    "description": "Compare notebook iterations",
                    "iteration_ids": ids,
                    "metric_ids": ["exec_time"],
                    "status": "pending",
                    "created_at": created_at,
                }]
            }),
        )?;

        log::info!("Benchmark config created at {}", config_dir.display());
        Ok(Some(config_dir))
    }

    fn run(&self, config_dir: &Path, output_dir: &Path) -> Result<Option<PathBuf>> {
        let runs_file = config_dir.join("runs.json");
        if !runs_file.is_file() {
            log::warn!("No runs.json found in {}", config_dir.display());
            return Ok(None);
        }
        let content = fs::read_to_string(&runs_file).map_err(|e| NbpackError::io(&runs_file, e))?;
        let runs: Value = serde_json::from_str(&content).map_err(|e| NbpackError::InvalidState {
            path: runs_file.clone(),
            message: e.to_string(),
        })?;

        for run in pending_runs(&runs) {
            log::info!("Executing benchmark run: {}", run);
            self.invoke(&["run", run], config_dir)?;
        }

        let report = self.invoke(&["report"], config_dir)?;
        let report_path = output_dir.join(REPORT_FILE_NAME);
        write_atomic(&report_path, report.as_bytes())?;
        log::info!("Benchmark report generated: {}", report_path.display());
        Ok(Some(report_path))
    }
}

/// Ids of runs whose status is `pending`.
fn pending_runs(runs: &Value) -> Vec<&str> {
    runs.get("runs")
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter(|r| r.get("status").and_then(Value::as_str) == Some("pending"))
                .filter_map(|r| r.get("id").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn discover_iterations(iterations_dir: &Path) -> Result<Vec<Value>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(iterations_dir)
        .map_err(|e| NbpackError::io(iterations_dir, e))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    entries.sort();

    let mut iterations = Vec::new();
    for entry in entries {
        let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !entry.join(ENTRY_POINT).is_file() {
            log::debug!("Skipping {} (no {})", name, ENTRY_POINT);
            continue;
        }
        iterations.push(json!({
            "id": name.clone(),
            "name": title_case(&name),
            "description": format!("Iteration from {}", name),
            "source_path": entry.display().to_string(),
            "entry_point": ENTRY_POINT,
            "approach": name,
            "parameters": {},
            "parent": null,
            "created_at": Utc::now().to_rfc3339(),
            "tags": [],
        }));
    }
    Ok(iterations)
}

/// `fast_sort` → `Fast Sort`.
fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
