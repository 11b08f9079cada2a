//! PDF page access and splitting.

mod document;
#[cfg(test)]
pub(crate) mod fixtures;
mod writer;

pub use document::PdfDocument;
pub use writer::{sanitize_file_stem, SplitOutput, SplitWriter};

use crate::error::PdfError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Per-page access to a source document.
///
/// Pages are addressed by zero-based index.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Text from the page's embedded text layer (may be empty).
    fn page_text(&self, index: usize) -> Result<String>;

    /// Rasterize the page at the given resolution.
    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        (**self).page_text(index)
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage> {
        (**self).render_page(index, dpi)
    }
}
