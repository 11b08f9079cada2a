//! Configuration structures for the classification pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Main configuration for the pagesort pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PagesortConfig {
    /// Page text extraction and OCR preprocessing.
    pub extraction: ExtractionConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Model configuration.
    pub models: ModelConfig,

    /// Page scheduling.
    pub pipeline: PipelineConfig,

    /// Output and diagnostics.
    pub output: OutputConfig,
}

/// Settings for turning a page into text.
///
/// The defaults are tuned for faint scanned text: pages are rendered at
/// 400 DPI, contrast is boosted 2.5x around the mean gray level and the
/// result is binarized at gray value 110.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// DPI for rendering image-only pages before OCR.
    pub render_dpi: u32,

    /// Multiplicative contrast factor applied to the grayscale page.
    pub contrast_factor: f32,

    /// Gray values below this become foreground (black), the rest white.
    pub binarize_threshold: u8,

    /// Maximum seconds one page may spend in OCR (0 = unlimited).
    pub ocr_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            render_dpi: 400,
            contrast_factor: 2.5,
            binarize_threshold: 110,
            ocr_timeout_secs: 120,
        }
    }
}

impl ExtractionConfig {
    /// Reject settings that would make every OCR attempt meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_dpi == 0 {
            return Err(ConfigError::Invalid {
                field: "extraction.render_dpi".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if !self.contrast_factor.is_finite() || self.contrast_factor <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "extraction.contrast_factor".to_string(),
                reason: format!("must be a positive number, got {}", self.contrast_factor),
            });
        }
        Ok(())
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Keep `[UNK]` tokens emitted by the recognizer instead of blanking them.
    pub keep_unk: bool,

    /// Vertical distance in pixels within which text boxes share a line.
    pub row_tolerance_px: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            keep_unk: false,
            row_tolerance_px: 20.0,
        }
    }
}

/// Model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// True when every file the OCR engine needs is present.
    pub fn is_available(&self) -> bool {
        [&self.detection_model, &self.recognition_model, &self.dictionary]
            .iter()
            .all(|name| self.model_dir.join(name).exists())
    }
}

/// Page scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of pages processed concurrently (1 = sequential).
    pub jobs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write `page_<n>_extracted.txt` for every page.
    pub dump_page_text: bool,

    /// Characters of page text shown in previews.
    pub preview_chars: usize,

    /// File stem of the bucket for pages no rule matched.
    pub unclassified_name: String,

    /// Write `report.json` next to the split documents.
    pub write_report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dump_page_text: false,
            preview_chars: 200,
            unclassified_name: "unclassified".to_string(),
            write_report: false,
        }
    }
}

impl PagesortConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.extraction.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_scan_tuning() {
        let config = PagesortConfig::default();
        assert_eq!(config.extraction.render_dpi, 400);
        assert_eq!(config.extraction.contrast_factor, 2.5);
        assert_eq!(config.extraction.binarize_threshold, 110);
        assert_eq!(config.pipeline.jobs, 1);
        assert_eq!(config.output.unclassified_name, "unclassified");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PagesortConfig =
            serde_json::from_str(r#"{"extraction": {"render_dpi": 300}}"#).unwrap();
        assert_eq!(config.extraction.render_dpi, 300);
        assert_eq!(config.extraction.binarize_threshold, 110);
        assert_eq!(config.output.preview_chars, 200);
    }

    #[test]
    fn test_validate_rejects_zero_dpi() {
        let config = ExtractionConfig {
            render_dpi: 0,
            ..ExtractionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_contrast() {
        let config = ExtractionConfig {
            contrast_factor: f32::NAN,
            ..ExtractionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PagesortConfig::default();
        config.pipeline.jobs = 4;
        config.output.dump_page_text = true;
        config.save(&path).unwrap();

        let loaded = PagesortConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pipeline.jobs, 4);
        assert!(loaded.output.dump_page_text);
    }

    #[test]
    fn test_missing_file() {
        let err = PagesortConfig::from_file(std::path::Path::new("/nonexistent/config.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
