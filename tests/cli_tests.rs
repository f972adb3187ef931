//! Integration tests for CLI wiring.
//!
//! These tests validate that the CLI is a thin adapter over the library
//! with proper error handling and exit codes. None of them need Jupyter.

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use std::fs;
    use std::path::Path;
    use std::process::{Command, Output};
    use tempfile::TempDir;

    fn nbpack(args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_nbpack"))
            .args(args)
            .env("RUST_LOG", "warn")
            .output()
            .expect("Failed to run nbpack binary")
    }

    fn write_notebook(dir: &Path, name: &str) {
        let nb = json!({
            "nbformat": 4,
            "nbformat_minor": 5,
            "metadata": {"kernelspec": {"name": "python3"}},
            "cells": [
                {"cell_type": "code", "metadata": {}, "execution_count": null, "outputs": [],
                 "source": "import pandas as pd\n# YOUR CODE HERE"},
                {"cell_type": "markdown", "metadata": {}, "source": "YOUR ANSWER HERE"}
            ]
        });
        fs::write(dir.join(name), serde_json::to_string(&nb).unwrap()).expect("Failed to write notebook");
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let output = nbpack(&[]);
        assert!(!output.status.success());
    }

    #[test]
    fn test_cli_parse_prints_summary() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_notebook(dir.path(), "hw.ipynb");

        let output = nbpack(&["parse", dir.path().to_str().unwrap()]);

        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        let summary: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
        assert_eq!(summary["num_cells"], json!(2));
        assert_eq!(summary["todo_code"], json!(1));
        assert_eq!(summary["todo_markdown"], json!(1));
        assert_eq!(summary["kernel_spec"], json!("python3"));
        assert_eq!(summary["has_instructions"], json!(false));
    }

    #[test]
    fn test_cli_ingest_project() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_notebook(dir.path(), "hw.ipynb");
        fs::write(dir.path().join("data.csv"), "a,b\n1,2\n").unwrap();

        let output = nbpack(&["ingest", dir.path().to_str().unwrap()]);

        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Assets: 2 files"), "stdout: {}", stdout);
        assert!(stdout.contains("Dependencies: pandas"), "stdout: {}", stdout);
        assert!(dir.path().join("input/hw.ipynb").is_file());
        assert!(dir.path().join("ingested/manifest.json").is_file());
        assert!(dir.path().join("ingested/notebook.ipynb").is_file());
    }

    #[test]
    fn test_cli_ingest_conflict_exit_code() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("input")).unwrap();
        write_notebook(&dir.path().join("input"), "hw.ipynb");
        fs::write(dir.path().join("stray.csv"), "a\n1\n").unwrap();

        let output = nbpack(&["ingest", dir.path().to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Conflict"), "stderr: {}", stderr);
        assert!(dir.path().join("stray.csv").is_file());
    }

    #[test]
    fn test_cli_missing_folder() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let missing = dir.path().join("nowhere");

        let output = nbpack(&["ingest", missing.to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
    }

    #[test]
    fn test_cli_validate_without_runs() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("input")).unwrap();

        let output = nbpack(&["validate", dir.path().to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("Run not found"));
    }

    #[test]
    fn test_cli_invalid_config() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_notebook(dir.path(), "hw.ipynb");
        let config = dir.path().join("custom.json");
        fs::write(&config, r#"{"detection": {"todo_patterns": ["("]}}"#).unwrap();

        let output = nbpack(&["parse", dir.path().to_str().unwrap(), "--config", config.to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid detection pattern"));
    }
}
