//! Subcommands and the setup they share.

pub mod classify;
pub mod config;
pub mod rules;
pub mod split;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::{debug, warn};

use pagesort_core::models::config::PagesortConfig;
use pagesort_core::{PageTextExtractor, PureOcrEngine, RuleTable};

/// Options shared by every command that classifies pages.
#[derive(Args)]
pub struct PageOptions {
    /// Rule file (YAML) listing doc types and their keywords
    #[arg(short, long, default_value = "rule.yml")]
    pub rules: PathBuf,

    /// Number of pages processed in parallel
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// OCR model directory
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,

    /// Render DPI for pages that need OCR
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Skip OCR; pages without a text layer stay unclassified
    #[arg(long)]
    pub no_ocr: bool,
}

impl PageOptions {
    /// Fold command line overrides into `config`.
    pub fn apply(&self, config: &mut PagesortConfig) -> anyhow::Result<()> {
        if let Some(jobs) = self.jobs {
            config.pipeline.jobs = jobs.max(1);
        }
        if let Some(dir) = &self.model_dir {
            config.models.model_dir = dir.clone();
        }
        if let Some(dpi) = self.dpi {
            config.extraction.render_dpi = dpi;
        }
        config.extraction.validate()?;
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagesort")
        .join("config.json")
}

/// Load the config named on the command line, else the user config, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PagesortConfig> {
    if let Some(path) = config_path {
        return Ok(PagesortConfig::from_file(Path::new(path))?);
    }

    let user_config = default_config_path();
    if user_config.exists() {
        debug!("Using config {}", user_config.display());
        Ok(PagesortConfig::from_file(&user_config)?)
    } else {
        Ok(PagesortConfig::default())
    }
}

pub fn load_rules(path: &Path) -> anyhow::Result<RuleTable> {
    let rules = RuleTable::from_file(path)
        .map_err(|e| anyhow::anyhow!("Invalid rule file {}: {}", path.display(), e))?;
    debug!("Loaded {} doc types from {}", rules.len(), path.display());
    Ok(rules)
}

/// Build the page text extractor, with OCR when models are present.
pub fn build_extractor(config: &PagesortConfig, no_ocr: bool) -> PageTextExtractor {
    let extractor = PageTextExtractor::new(&config.extraction);
    if no_ocr {
        return extractor;
    }

    if !config.models.is_available() {
        warn!(
            "OCR models not found at {}, scanned pages will be unclassified",
            config.models.model_dir.display()
        );
        eprintln!(
            "{} OCR models not found at {}; continuing without OCR",
            style("⚠").yellow(),
            config.models.model_dir.display()
        );
        return extractor;
    }

    match PureOcrEngine::with_instances(&config.models, config.ocr.clone(), config.pipeline.jobs) {
        Ok(engine) => extractor.with_ocr(Arc::new(engine)),
        Err(e) => {
            warn!("Failed to load OCR engine: {}", e);
            eprintln!(
                "{} Failed to load OCR engine ({}); continuing without OCR",
                style("⚠").yellow(),
                e
            );
            extractor
        }
    }
}
