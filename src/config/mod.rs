//! Configuration: detection rule tables and processing options.
//!
//! Every heuristic the analyzer and parser apply (marker patterns, stdlib
//! exclusions, API-service packages, hardcoded-path pattern) lives in
//! [`DetectionRules`] so it can be extended from a JSON file without
//! touching the detection code.

use crate::error::{NbpackError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Config file looked up at a project root.
pub const CONFIG_FILE_NAME: &str = "nbpack.json";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detection rule tables.
    pub detection: DetectionRules,
    /// Processing pipeline options.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Parse a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| NbpackError::io(path, e))?;
        let config: Config = serde_json::from_str(&content).map_err(|e| NbpackError::InvalidConfig {
            message: format!("{}: JSON parse error: {}", path.display(), e),
        })?;

        // Fail early on a bad pattern rather than mid-ingestion
        config.detection.compile()?;

        Ok(config)
    }

    /// Load `nbpack.json` from `root` if present, defaults otherwise.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            log::debug!("Loading config from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Processing pipeline options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Per-cell execution timeout in seconds.
    pub timeout_secs: u64,
    /// Kernel override; the notebook's own kernel is used when unset.
    pub kernel: Option<String>,
    /// Program used for execution and export.
    pub jupyter: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        ProcessingConfig {
            timeout_secs: 600,
            kernel: None,
            jupyter: "jupyter".to_string(),
        }
    }
}

impl ProcessingConfig {
    /// Execution timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Heuristic tables used by notebook analysis and parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionRules {
    /// Ordered marker patterns for ingestion analysis; first match wins.
    pub todo_patterns: Vec<String>,
    /// Patterns flagging a code cell as needing completion.
    pub code_todo_patterns: Vec<String>,
    /// Patterns flagging a markdown cell as needing an answer.
    pub markdown_todo_patterns: Vec<String>,
    /// Top-level modules never reported as dependencies.
    pub stdlib_modules: BTreeSet<String>,
    /// Packages that talk to hosted API services.
    pub api_packages: BTreeSet<String>,
    /// String-literal pattern for hardcoded paths; group 1 is reported.
    pub hardcoded_path_pattern: String,
}

const DEFAULT_TODO_PATTERNS: &[&str] = &[
    r"(?i)#\s*TODO",
    r"(?i)raise\s+NotImplementedError",
    r"(?i)#\s*YOUR\s+CODE\s+HERE",
    r"(?i)\*\*Your\s+answer\s+here:?\*\*",
    r"(?i)\*\*YOUR\s+ANSWER\s+HERE:?\*\*",
    r"(?i)<--\s*YOUR\s+SYSTEM\s+PROMPT\s+GOES\s+HERE\s*-->",
    r"(?i)<--\s*YOUR\s+USER\s+PROMPT\s+GOES\s+HERE\s*-->",
    r"(?i)`<Enter\s+your\s+.*here>`",
    r"(?i)<!--\s*YOUR\s+ANSWER\s+HERE\s*-->",
];

const DEFAULT_CODE_TODO_PATTERNS: &[&str] = &[
    r"(?i)#\s*TODO",
    r"(?i)#\s*YOUR\s+CODE\s+HERE",
    r"raise\s+NotImplementedError",
];

const DEFAULT_MARKDOWN_TODO_PATTERNS: &[&str] = &[
    r"(?i)\*\*Your\s+answer\s+here\b",
    r"YOUR\s+ANSWER\s+HERE",
    r"(?i)<!--\s*answer\s*-->",
];

const DEFAULT_STDLIB_MODULES: &[&str] = &[
    "abc", "argparse", "base64", "collections", "configparser", "copy", "csv", "dataclasses",
    "datetime", "enum", "functools", "glob", "hashlib", "io", "itertools", "json", "logging",
    "math", "os", "pathlib", "pprint", "random", "re", "shutil", "string", "subprocess", "sys",
    "tempfile", "textwrap", "time", "typing", "unittest", "warnings",
];

const DEFAULT_API_PACKAGES: &[&str] = &[
    "anthropic",
    "cohere",
    "google",
    "huggingface_hub",
    "openai",
    "replicate",
];

const DEFAULT_HARDCODED_PATH_PATTERN: &str =
    r#"(?i)["']([^"']*(?:your_file|\.csv|\.tsv|\.json|\.xlsx|/path/to|\\path\\to)[^"']*)["']"#;

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for DetectionRules {
    fn default() -> Self {
        DetectionRules {
            todo_patterns: owned(DEFAULT_TODO_PATTERNS),
            code_todo_patterns: owned(DEFAULT_CODE_TODO_PATTERNS),
            markdown_todo_patterns: owned(DEFAULT_MARKDOWN_TODO_PATTERNS),
            stdlib_modules: DEFAULT_STDLIB_MODULES.iter().map(|s| s.to_string()).collect(),
            api_packages: DEFAULT_API_PACKAGES.iter().map(|s| s.to_string()).collect(),
            hardcoded_path_pattern: DEFAULT_HARDCODED_PATH_PATTERN.to_string(),
        }
    }
}

impl DetectionRules {
    /// Compile every pattern. Patterns match case-sensitively unless they
    /// carry an inline `(?i)` flag.
    pub fn compile(&self) -> Result<CompiledRules> {
        Ok(CompiledRules {
            todo_patterns: compile_all(&self.todo_patterns)?,
            code_todo_patterns: compile_all(&self.code_todo_patterns)?,
            markdown_todo_patterns: compile_all(&self.markdown_todo_patterns)?,
            stdlib_modules: self.stdlib_modules.clone(),
            api_packages: self.api_packages.clone(),
            hardcoded_path: compile_one(&self.hardcoded_path_pattern)?,
        })
    }
}

fn compile_one(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(pattern)?)
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile_one(p)).collect()
}

/// [`DetectionRules`] with patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    /// Ordered marker patterns for analysis.
    pub todo_patterns: Vec<Regex>,
    /// Code-cell completion patterns.
    pub code_todo_patterns: Vec<Regex>,
    /// Markdown-cell answer patterns.
    pub markdown_todo_patterns: Vec<Regex>,
    /// Excluded stdlib modules.
    pub stdlib_modules: BTreeSet<String>,
    /// API-service packages.
    pub api_packages: BTreeSet<String>,
    /// Hardcoded path literal pattern.
    pub hardcoded_path: Regex,
}

impl CompiledRules {
    /// Compile the built-in rule set.
    pub fn builtin() -> Result<Self> {
        DetectionRules::default().compile()
    }
}
