//! Image preprocessing for OCR.
//!
//! Scanned pages are converted to grayscale, contrast-stretched around their
//! mean gray level and binarized with a fixed threshold. This favours faint
//! scans over photographs.

use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::models::config::ExtractionConfig;

/// Image preprocessor for the OCR fallback.
pub struct ImagePreprocessor {
    /// Multiplicative contrast factor.
    contrast_factor: f32,
    /// Gray values below this become black.
    threshold: u8,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }

    /// Create a preprocessor using the extraction settings.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            contrast_factor: config.contrast_factor,
            threshold: config.binarize_threshold,
        }
    }

    /// Set the contrast factor.
    pub fn with_contrast_factor(mut self, factor: f32) -> Self {
        self.contrast_factor = factor;
        self
    }

    /// Set the binarization threshold.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Grayscale, enhance contrast and binarize a rendered page.
    pub fn prepare_for_ocr(&self, image: &DynamicImage) -> GrayImage {
        let gray = self.to_grayscale(image);
        let enhanced = self.enhance_contrast(&gray);
        let binary = self.binarize(&enhanced);

        debug!(
            "Prepared {}x{} page image (contrast {}, threshold {})",
            binary.width(),
            binary.height(),
            self.contrast_factor,
            self.threshold
        );
        binary
    }

    /// Convert to 8-bit luminance with ITU-R 601-2 weights.
    pub fn to_grayscale(&self, image: &DynamicImage) -> GrayImage {
        if let DynamicImage::ImageLuma8(gray) = image {
            return gray.clone();
        }

        let rgb = image.to_rgb8();
        let mut gray = GrayImage::new(rgb.width(), rgb.height());
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let luma = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000;
            gray.put_pixel(x, y, Luma([luma as u8]));
        }
        gray
    }

    /// Scale each pixel's distance from the image's mean gray level.
    pub fn enhance_contrast(&self, image: &GrayImage) -> GrayImage {
        let mean = mean_gray(image);
        let factor = self.contrast_factor;

        let mut result = image.clone();
        for pixel in result.pixels_mut() {
            let value = mean + factor * (pixel[0] as f32 - mean);
            pixel[0] = value.clamp(0.0, 255.0) as u8;
        }
        result
    }

    /// Threshold into pure black (below threshold) and white.
    pub fn binarize(&self, image: &GrayImage) -> GrayImage {
        let mut result = image.clone();
        for pixel in result.pixels_mut() {
            pixel[0] = if pixel[0] < self.threshold { 0 } else { 255 };
        }
        result
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean gray level rounded to the nearest integer.
fn mean_gray(image: &GrayImage) -> f32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| p[0] as u64).sum();
    (sum as f64 / count as f64 + 0.5).floor() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_grayscale_weights() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, Rgb([255, 255, 255]));

        let gray = ImagePreprocessor::new().to_grayscale(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 149);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_contrast_stretches_around_mean() {
        // Mean of [100, 140] is 120.
        let gray = GrayImage::from_raw(2, 1, vec![100, 140]).unwrap();
        let enhanced = ImagePreprocessor::new().enhance_contrast(&gray);
        assert_eq!(enhanced.as_raw(), &vec![70, 170]);
    }

    #[test]
    fn test_contrast_clamps() {
        let gray = GrayImage::from_raw(2, 1, vec![0, 255]).unwrap();
        let enhanced = ImagePreprocessor::new().enhance_contrast(&gray);
        assert_eq!(enhanced.as_raw(), &vec![0, 255]);
    }

    #[test]
    fn test_binarize_threshold_boundary() {
        let gray = GrayImage::from_raw(4, 1, vec![0, 109, 110, 255]).unwrap();
        let binary = ImagePreprocessor::new().binarize(&gray);
        assert_eq!(binary.as_raw(), &vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_custom_threshold() {
        let gray = GrayImage::from_raw(3, 1, vec![60, 127, 128]).unwrap();
        let binary = ImagePreprocessor::new().with_threshold(128).binarize(&gray);
        assert_eq!(binary.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn test_faint_text_becomes_black() {
        // Light-gray strokes (150) on a near-white page (240): after the 2.5x
        // stretch the strokes drop below 110 while the paper stays white.
        let mut pixels = vec![240u8; 100];
        for p in pixels.iter_mut().take(10) {
            *p = 150;
        }
        let image = DynamicImage::ImageLuma8(GrayImage::from_raw(10, 10, pixels).unwrap());

        let binary = ImagePreprocessor::new().prepare_for_ocr(&image);
        assert_eq!(binary.get_pixel(0, 0)[0], 0);
        assert_eq!(binary.get_pixel(5, 5)[0], 255);
    }

    #[test]
    fn test_uniform_image_unchanged_by_contrast() {
        let gray = GrayImage::from_raw(3, 1, vec![128, 128, 128]).unwrap();
        let enhanced = ImagePreprocessor::new()
            .with_contrast_factor(10.0)
            .enhance_contrast(&gray);
        assert_eq!(enhanced.as_raw(), &vec![128, 128, 128]);
    }
}
