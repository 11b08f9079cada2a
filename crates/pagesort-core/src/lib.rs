//! Core library for splitting PDFs by document type.
//!
//! This crate provides:
//! - Page text extraction with an OCR fallback for scanned pages
//! - Keyword rules loaded from YAML and first-match classification
//! - Grouping of pages by doc type and writing one PDF per group

pub mod error;
pub mod extract;
pub mod group;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod rules;

pub use error::{ConfigError, OcrError, PagesortError, PdfError, Result};
pub use extract::PageTextExtractor;
pub use group::{group, DocGroup, GroupingResult};
pub use models::{Classification, PageRecord, PageText, PagesortConfig, UnclassifiedReason};
pub use ocr::{ImagePreprocessor, OcrBackend, OcrResult, TextBox};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{PageSource, PdfDocument, SplitOutput, SplitWriter};
pub use pipeline::{ClassificationRun, DocTypeCount, Pipeline, RunSummary};
pub use rules::{classify, normalize, DocTypeRule, RuleTable};
