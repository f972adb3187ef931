//! Package manifest: the single durable description of an ingested package.
//!
//! `manifest.json` holds the package identity, notebook metadata and
//! analysis, every asset with its repair history, and the configuration
//! stubs downstream tooling fills in.

use crate::error::{NbpackError, Result};
use crate::fsutil::write_json_atomic;
use crate::models::{Asset, AssetType, NotebookAnalysis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Manifest file name inside a package.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

const DEFAULT_NOTEBOOK_NAME: &str = "notebook.ipynb";
const DEFAULT_KERNEL: &str = "python3";

/// Package identity and lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Directory name of the package.
    pub id: String,
    /// Display name derived from `id`.
    pub name: String,
    /// Course label, empty until assigned.
    #[serde(default)]
    pub course: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Lifecycle status (`pending` after ingestion).
    pub status: String,
}

/// The package notebook and its analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookMetadata {
    /// Canonical notebook name inside the package.
    pub filename: String,
    /// Path of the notebook as it was found.
    pub original_filename: String,
    /// Kernel name.
    pub kernel: String,
    /// Whether the notebook needs a GPU to run.
    #[serde(default)]
    pub requires_gpu: bool,
    /// Analysis computed at ingestion.
    #[serde(default)]
    pub analysis: Option<NotebookAnalysis>,
}

/// A suggested rewrite of part of the instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionImprovement {
    /// Section or step the suggestion targets.
    pub section: String,
    /// Text as written.
    pub original: String,
    /// Proposed text.
    pub improved: String,
    /// Why the change helps.
    #[serde(default)]
    pub rationale: String,
}

/// Model selection for content generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Delivery model name.
    #[serde(default)]
    pub delivery: String,
    /// Fallback model name.
    #[serde(default)]
    pub default: String,
}

/// Benchmark comparison settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Whether benchmarking runs after processing.
    #[serde(default)]
    pub enabled: bool,
    /// Iteration names to compare.
    #[serde(default)]
    pub iterations: Vec<String>,
}

/// An artifact produced by a processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputArtifact {
    /// Package-relative path.
    pub path: String,
    /// Artifact kind (`notebook`, `html`, ...).
    #[serde(rename = "type")]
    pub kind: String,
}

/// Top-level manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Identity and status.
    pub package: PackageMetadata,
    /// Notebook metadata.
    pub notebook: NotebookMetadata,
    /// Every file found at ingestion.
    pub assets: Vec<Asset>,
    /// Instruction suggestions (currently always empty).
    #[serde(default)]
    pub instruction_improvements: Vec<InstructionImprovement>,
    /// Content-generation settings.
    #[serde(default)]
    pub llm_config: LlmConfig,
    /// Benchmark settings.
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    /// Artifacts from processing runs.
    #[serde(default)]
    pub outputs: Vec<OutputArtifact>,
}

impl PackageManifest {
    /// Load `manifest.json` from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| NbpackError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| NbpackError::InvalidState {
            path: path.to_path_buf(),
            message: format!("JSON parse error: {}", e),
        })
    }

    /// Write the manifest atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }

    /// The notebook asset, if one was found.
    pub fn notebook_asset(&self) -> Option<&Asset> {
        self.assets.iter().find(|a| a.asset_type == AssetType::Notebook)
    }
}

/// Assembles ingestion outputs into a [`PackageManifest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestGenerator;

impl ManifestGenerator {
    /// Create a generator.
    pub fn new() -> Self {
        ManifestGenerator
    }

    /// Build the manifest and write it to `<package_dir>/manifest.json`.
    pub fn generate(
        &self,
        package_dir: &Path,
        assets: Vec<Asset>,
        analysis: NotebookAnalysis,
        improvements: Vec<InstructionImprovement>,
    ) -> Result<PackageManifest> {
        let id = package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let original_filename = assets
            .iter()
            .find(|a| a.asset_type == AssetType::Notebook)
            .map(|a| a.path.clone())
            .unwrap_or_else(|| DEFAULT_NOTEBOOK_NAME.to_string());
        let kernel = analysis
            .kernel_spec
            .clone()
            .unwrap_or_else(|| DEFAULT_KERNEL.to_string());

        let manifest = PackageManifest {
            package: PackageMetadata {
                name: display_name(&id),
                id,
                course: String::new(),
                created_at: chrono::Utc::now().to_rfc3339(),
                status: "pending".to_string(),
            },
            notebook: NotebookMetadata {
                filename: DEFAULT_NOTEBOOK_NAME.to_string(),
                original_filename,
                kernel,
                requires_gpu: false,
                analysis: Some(analysis),
            },
            assets,
            instruction_improvements: improvements,
            llm_config: LlmConfig::default(),
            benchmark: BenchmarkConfig::default(),
            outputs: Vec::new(),
        };

        let path = package_dir.join(MANIFEST_FILE_NAME);
        manifest.save(&path)?;
        log::info!("Wrote manifest: {}", path.display());
        Ok(manifest)
    }
}

/// `w9-email_prioritization` -> `W9 Email Prioritization`.
pub fn display_name(id: &str) -> String {
    id.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
