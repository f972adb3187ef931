//! Raw folder → normalized package ingestion pipeline.
//!
//! Phases run in a fixed order over a copy of the raw folder:
//! inventory, data repair, notebook analysis, instruction improvement,
//! manifest assembly. The transformation audit log is written last.

pub mod detect;
pub mod encoding;
pub mod imports;
pub mod improve;
pub mod inventory;
pub mod preprocess;
pub mod repair;
pub mod transformations;

use crate::config::CompiledRules;
use crate::error::{NbpackError, Result};
use crate::layout::ProjectLayout;
use crate::manifest::{ManifestGenerator, PackageManifest, MANIFEST_FILE_NAME};
use crate::models::{Asset, AssetType};
use improve::InstructionImprover;
use inventory::InventoryScanner;
use preprocess::NotebookPreprocessor;
use repair::DataRepairer;
use std::fs;
use std::path::Path;
use transformations::TransformationLog;

/// Audit log file name inside a package.
pub const TRANSFORMATIONS_LOG_NAME: &str = "transformations.log";

/// Main ingestion orchestrator.
#[derive(Debug, Clone)]
pub struct Ingestor {
    scanner: InventoryScanner,
    repairer: DataRepairer,
    preprocessor: NotebookPreprocessor,
    improver: InstructionImprover,
    manifest_gen: ManifestGenerator,
}

impl Ingestor {
    /// Create an ingestor with the built-in detection rules.
    pub fn new() -> Result<Self> {
        Self::with_rules(CompiledRules::builtin()?)
    }

    /// Create an ingestor with custom detection rules.
    pub fn with_rules(rules: CompiledRules) -> Result<Self> {
        Ok(Ingestor {
            scanner: InventoryScanner::new(),
            repairer: DataRepairer::new(),
            preprocessor: NotebookPreprocessor::new(rules)?,
            improver: InstructionImprover::new(),
            manifest_gen: ManifestGenerator::new(),
        })
    }

    /// Ingest `raw_dir` into `target_dir` and write its manifest.
    pub fn ingest(&self, raw_dir: &Path, target_dir: &Path) -> Result<PackageManifest> {
        if !raw_dir.is_dir() {
            return Err(NbpackError::not_found("Source directory", raw_dir));
        }
        fs::create_dir_all(target_dir).map_err(|e| NbpackError::io(target_dir, e))?;
        let mut log = TransformationLog::new();

        log::info!("Starting ingestion: {} -> {}", raw_dir.display(), target_dir.display());

        log::info!("Phase 1: Scanning inventory");
        let assets = self.scanner.scan(raw_dir)?;
        log::info!("Found {} asset(s)", assets.len());
        copy_assets(raw_dir, target_dir, &assets)?;

        log::info!("Phase 2: Repairing data files");
        let mut assets: Vec<Asset> = assets
            .into_iter()
            .map(|asset| match asset.asset_type {
                AssetType::Data => self.repairer.repair(asset, target_dir, &mut log),
                _ => asset,
            })
            .collect();

        log::info!("Phase 3: Preprocessing notebook");
        let notebook = assets
            .iter_mut()
            .find(|a| a.asset_type == AssetType::Notebook)
            .ok_or_else(|| NbpackError::not_found("Notebook", raw_dir))?;
        let result = self
            .preprocessor
            .preprocess(&target_dir.join(&notebook.path), target_dir, &mut log)?;
        notebook.extracted_images = result.images;
        let analysis = result.analysis;

        log::info!("Phase 4: Improving instructions");
        let instructions = assets
            .iter()
            .find(|a| a.asset_type == AssetType::Instructions)
            .map(|a| target_dir.join(&a.path));
        let improvements = self.improver.improve(&analysis, instructions.as_deref(), None);

        log::info!("Phase 5: Generating manifest");
        let manifest = self.manifest_gen.generate(target_dir, assets, analysis, improvements)?;

        log.save(&target_dir.join(TRANSFORMATIONS_LOG_NAME))?;
        log::info!("Ingestion complete: {}", log.summary());

        Ok(manifest)
    }

    /// Ingest a project laid out as `input/`, `ingested/`, `output/`.
    ///
    /// Loose files at the root are moved into `input/` first. An existing
    /// `ingested/manifest.json` is returned as-is unless `force` is set, in
    /// which case `ingested/` is wiped and rebuilt.
    pub fn ingest_project(&self, layout: &ProjectLayout, force: bool) -> Result<PackageManifest> {
        layout.ensure_dirs()?;
        if layout.has_loose_files()? {
            layout.move_loose_files(force)?;
        }

        let ingested = layout.ingested_dir();
        let manifest_path = ingested.join(MANIFEST_FILE_NAME);
        if manifest_path.is_file() && !force {
            log::info!("Already ingested, loading {}", manifest_path.display());
            return PackageManifest::load(&manifest_path);
        }

        if force && ingested.exists() {
            log::info!("Discarding previous ingestion in {}", ingested.display());
            fs::remove_dir_all(&ingested).map_err(|e| NbpackError::io(&ingested, e))?;
            fs::create_dir_all(&ingested).map_err(|e| NbpackError::io(&ingested, e))?;
        }

        self.ingest(&layout.input_dir(), &ingested)
    }
}

/// Copy every scanned file, preserving relative paths.
fn copy_assets(raw_dir: &Path, target_dir: &Path, assets: &[Asset]) -> Result<()> {
    for asset in assets {
        let src = raw_dir.join(&asset.path);
        let dst = target_dir.join(&asset.path);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| NbpackError::io(parent, e))?;
        }
        fs::copy(&src, &dst).map_err(|e| NbpackError::io(&src, e))?;
    }
    Ok(())
}
