//! Page text acquisition with an OCR fallback.
//!
//! Native text is always preferred. OCR runs only when a page has no text
//! layer at all; it is not used to second-guess native text quality.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;
use tracing::{debug, warn};

use crate::error::{OcrError, PagesortError};
use crate::models::config::ExtractionConfig;
use crate::models::PageText;
use crate::ocr::{ImagePreprocessor, OcrBackend, OcrResult};
use crate::pdf::PageSource;

/// Obtains text for a page, never failing.
pub struct PageTextExtractor {
    render_dpi: u32,
    ocr_timeout: Option<Duration>,
    preprocessor: ImagePreprocessor,
    ocr: Option<Arc<dyn OcrBackend>>,
    /// Timed-out OCR calls that have not returned yet.
    stalled: Arc<AtomicUsize>,
}

impl PageTextExtractor {
    /// Create an extractor without OCR; image-only pages yield no text.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            render_dpi: config.render_dpi,
            ocr_timeout: (config.ocr_timeout_secs > 0)
                .then(|| Duration::from_secs(config.ocr_timeout_secs)),
            preprocessor: ImagePreprocessor::from_config(config),
            ocr: None,
            stalled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Use `backend` for pages without a text layer.
    pub fn with_ocr(mut self, backend: Arc<dyn OcrBackend>) -> Self {
        self.ocr = Some(backend);
        self
    }

    /// Limit the time one page may spend in OCR (`None` = unlimited).
    pub fn with_ocr_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }

    /// Text for page `index` of `source`.
    ///
    /// Failures at any stage are logged and fall through to the next one;
    /// when nothing yields text the result is [`PageText::NoText`].
    pub fn extract<S: PageSource + ?Sized>(&self, source: &S, index: usize) -> PageText {
        match source.page_text(index) {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    return PageText::Native(text.to_string());
                }
                debug!("Page {} has no native text, trying OCR", index);
            }
            Err(e) => warn!("Native text extraction failed on page {}: {}", index, e),
        }

        let Some(backend) = &self.ocr else {
            debug!("OCR not configured, page {} has no text", index);
            return PageText::NoText;
        };

        match self.ocr_page(backend, source, index) {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    debug!("OCR found no text on page {}", index);
                    PageText::NoText
                } else {
                    PageText::Ocr(text.to_string())
                }
            }
            Err(e) => {
                warn!("OCR failed on page {}: {}", index, e);
                PageText::NoText
            }
        }
    }

    fn ocr_page<S: PageSource + ?Sized>(
        &self,
        backend: &Arc<dyn OcrBackend>,
        source: &S,
        index: usize,
    ) -> Result<String, PagesortError> {
        let image = source.render_page(index, self.render_dpi)?;
        let prepared = self.preprocessor.prepare_for_ocr(&image);
        let result = self.recognize(backend, prepared)?;

        debug!(
            "OCR on page {}: {} text boxes in {}ms",
            index,
            result.boxes.len(),
            result.processing_time_ms
        );
        Ok(result.text)
    }

    /// Run the backend, abandoning it if it exceeds the timeout.
    ///
    /// An abandoned call keeps its engine busy, so no new call is started
    /// until it has returned.
    fn recognize(
        &self,
        backend: &Arc<dyn OcrBackend>,
        image: GrayImage,
    ) -> Result<OcrResult, OcrError> {
        let Some(timeout) = self.ocr_timeout else {
            return backend.recognize(&image);
        };

        if self.stalled.load(Ordering::SeqCst) > 0 {
            return Err(OcrError::Recognition(
                "skipped, an earlier OCR call timed out and is still running".to_string(),
            ));
        }

        // Set by whichever side finishes second: the worker returning or the
        // caller giving up. That side settles the stalled count.
        let settled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(backend);
        let worker_settled = Arc::clone(&settled);
        let stalled = Arc::clone(&self.stalled);
        std::thread::Builder::new()
            .name("pagesort-ocr".to_string())
            .spawn(move || {
                let result = worker.recognize(&image);
                drop(image);
                if worker_settled.swap(true, Ordering::SeqCst) {
                    stalled.fetch_sub(1, Ordering::SeqCst);
                    debug!("Timed-out OCR call finished, OCR resumes");
                }
                // The receiver is gone if we already timed out.
                let _ = tx.send(result);
            })
            .map_err(|e| OcrError::Recognition(format!("failed to start OCR thread: {}", e)))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.stalled.fetch_add(1, Ordering::SeqCst);
                if settled.swap(true, Ordering::SeqCst) {
                    self.stalled.fetch_sub(1, Ordering::SeqCst);
                }
                Err(OcrError::Timeout(timeout.as_secs()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(OcrError::Recognition(
                "OCR thread exited without a result".to_string(),
            )),
        }
    }
}
