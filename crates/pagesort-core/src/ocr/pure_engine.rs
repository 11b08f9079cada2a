//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Instant;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{OcrBackend, OcrResult, TextBox};

type Engine = pure_onnx_ocr::engine::OcrEngine;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// Holds one loaded engine per concurrent caller; a page waits only when all
/// instances are busy.
pub struct PureOcrEngine {
    engines: Vec<Mutex<Engine>>,
    config: OcrConfig,
}

impl PureOcrEngine {
    /// Create `instances` engines so that many pages can be recognized at once.
    pub fn with_instances(
        models: &ModelConfig,
        config: OcrConfig,
        instances: usize,
    ) -> Result<Self, OcrError> {
        let model_dir = models.model_dir.as_path();
        let det_path = model_dir.join(&models.detection_model);
        let rec_path = model_dir.join(&models.recognition_model);
        let dict_path = model_dir.join(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }

        let engines = (0..instances.max(1))
            .map(|_| build_engine(&det_path, &rec_path, &dict_path).map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Loaded {} pure-onnx-ocr engine(s) from {}",
            engines.len(),
            model_dir.display()
        );

        Ok(Self { engines, config })
    }

    fn acquire(&self) -> Result<MutexGuard<'_, Engine>, OcrError> {
        for slot in &self.engines {
            match slot.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => {
                    return Err(OcrError::Recognition("OCR engine poisoned".to_string()));
                }
            }
        }
        self.engines[0]
            .lock()
            .map_err(|_| OcrError::Recognition("OCR engine poisoned".to_string()))
    }
}

impl OcrBackend for PureOcrEngine {
    fn recognize(&self, image: &GrayImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("{}x{}", width, height)));
        }

        // The detector expects three channels.
        let input = DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(image.clone()).to_rgb8());

        let results = {
            let engine = self.acquire()?;
            engine
                .run_from_image(&input)
                .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?
        };

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let text_boxes: Vec<TextBox> = results
            .iter()
            .map(|r| {
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                TextBox {
                    bbox: polygon_to_bbox(&r.bounding_box),
                    text,
                    confidence: r.confidence,
                }
            })
            .collect();

        let processing_time_ms = start.elapsed().as_millis() as u64;
        let result = OcrResult::from_boxes(
            text_boxes,
            self.config.row_tolerance_px,
            (width, height),
            processing_time_ms,
        );

        debug!(
            "OCR complete: {} text boxes in {}ms",
            result.boxes.len(),
            processing_time_ms
        );

        Ok(result)
    }
}

fn build_engine(det_path: &Path, rec_path: &Path, dict_path: &Path) -> Result<Engine, OcrError> {
    pure_onnx_ocr::engine::OcrEngineBuilder::new()
        .det_model_path(det_path)
        .rec_model_path(rec_path)
        .dictionary_path(dict_path)
        .build()
        .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
///
/// Extracts the first 4 exterior points (quadrilateral) as
/// `[x1, y1, x2, y2, x3, y3, x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
