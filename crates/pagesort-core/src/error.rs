//! Error types for the pagesort-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pagesort library.
#[derive(Error, Debug)]
pub enum PagesortError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Rule or settings configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to obtain a raster image for a page.
    #[error("failed to render page: {0}")]
    Render(String),

    /// Failed to write a split document.
    #[error("failed to write PDF: {0}")]
    Write(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page index requested.
    #[error("invalid page index: {0}")]
    InvalidPage(usize),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Recognition did not finish within the configured limit.
    #[error("OCR timed out after {0}s")]
    Timeout(u64),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors in the rule table or run settings. These abort a run before any
/// page is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Rules or config file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File could not be read or parsed.
    #[error("failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// The rule source has no `doc_types` section, or it is empty.
    #[error("no document types defined")]
    MissingDocTypes,

    /// A doc type entry has no `match_keywords` list.
    #[error("document type '{0}' has no match_keywords")]
    MissingKeywords(String),

    /// Two entries share a name.
    #[error("duplicate document type '{0}'")]
    DuplicateDocType(String),

    /// A setting is out of range.
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Result type for the pagesort library.
pub type Result<T> = std::result::Result<T, PagesortError>;
