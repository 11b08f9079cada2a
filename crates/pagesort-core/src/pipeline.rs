//! Page classification pass over a whole document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::extract::PageTextExtractor;
use crate::group::{group, GroupingResult};
use crate::models::{Classification, PageRecord, UnclassifiedReason};
use crate::pdf::PageSource;
use crate::rules::{classify_text, RuleTable};

/// Drives extraction, normalization and matching for every page.
pub struct Pipeline<'r> {
    rules: &'r RuleTable,
    extractor: PageTextExtractor,
    jobs: usize,
    preview_chars: usize,
    text_dump_dir: Option<PathBuf>,
}

/// Everything a classification pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRun {
    /// One record per page, in page order.
    pub records: Vec<PageRecord>,
    /// Page indices grouped by outcome.
    pub grouping: GroupingResult,
    /// Wall-clock time of the pass.
    pub processing_time_ms: u64,
}

/// Page counts for a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_pages: usize,
    pub classified_pages: usize,
    pub unclassified_pages: usize,
    /// Unclassified because no text could be obtained.
    pub no_text_pages: usize,
    /// Pages whose text came from OCR.
    pub ocr_pages: usize,
    /// Pages per doc type, in first-occurrence order.
    pub doc_types: Vec<DocTypeCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocTypeCount {
    pub doc_type: String,
    pub pages: usize,
}

impl ClassificationRun {
    pub fn summary(&self) -> RunSummary {
        let no_text_pages = self
            .records
            .iter()
            .filter(|r| {
                r.classification == Classification::Unclassified(UnclassifiedReason::NoText)
            })
            .count();

        RunSummary {
            total_pages: self.records.len(),
            classified_pages: self.grouping.classified_count(),
            unclassified_pages: self.grouping.unclassified.len(),
            no_text_pages,
            ocr_pages: self.records.iter().filter(|r| r.raw_text.is_ocr()).count(),
            doc_types: self
                .grouping
                .groups
                .iter()
                .map(|g| DocTypeCount {
                    doc_type: g.doc_type.clone(),
                    pages: g.pages.len(),
                })
                .collect(),
        }
    }

    /// Doc type counts keyed by name, for lookups.
    pub fn counts_by_type(&self) -> BTreeMap<&str, usize> {
        self.grouping
            .groups
            .iter()
            .map(|g| (g.doc_type.as_str(), g.pages.len()))
            .collect()
    }
}

impl<'r> Pipeline<'r> {
    /// Create a sequential pipeline.
    pub fn new(rules: &'r RuleTable, extractor: PageTextExtractor) -> Self {
        Self {
            rules,
            extractor,
            jobs: 1,
            preview_chars: 200,
            text_dump_dir: None,
        }
    }

    /// Process up to `jobs` pages concurrently.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Characters of page text included in log previews.
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Write each page's text to `page_<n>_extracted.txt` in `dir`.
    pub fn with_text_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.text_dump_dir = Some(dir.into());
        self
    }

    /// Classify every page of `source`.
    pub fn run<S: PageSource + Sync + ?Sized>(&self, source: &S) -> ClassificationRun {
        self.run_with_progress(source, |_| {})
    }

    /// Classify every page, calling `on_page` as each page finishes.
    ///
    /// With more than one job `on_page` may be called out of page order; the
    /// returned records and groups are always in page order.
    pub fn run_with_progress<S, F>(&self, source: &S, on_page: F) -> ClassificationRun
    where
        S: PageSource + Sync + ?Sized,
        F: Fn(&PageRecord) + Sync,
    {
        let start = Instant::now();
        let page_count = source.page_count();
        info!("Classifying {} pages with {} job(s)", page_count, self.jobs);

        let records = if self.jobs > 1 {
            self.run_parallel(source, page_count, &on_page)
        } else {
            self.run_sequential(source, page_count, &on_page)
        };

        let grouping = group(&records);
        let processing_time_ms = start.elapsed().as_millis() as u64;
        debug!("Classified {} pages in {}ms", records.len(), processing_time_ms);

        ClassificationRun {
            records,
            grouping,
            processing_time_ms,
        }
    }

    fn run_sequential<S, F>(&self, source: &S, page_count: usize, on_page: &F) -> Vec<PageRecord>
    where
        S: PageSource + Sync + ?Sized,
        F: Fn(&PageRecord) + Sync,
    {
        (0..page_count)
            .map(|index| {
                let record = self.classify_page(source, index);
                on_page(&record);
                record
            })
            .collect()
    }

    fn run_parallel<S, F>(&self, source: &S, page_count: usize, on_page: &F) -> Vec<PageRecord>
    where
        S: PageSource + Sync + ?Sized,
        F: Fn(&PageRecord) + Sync,
    {
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Failed to start {} workers ({}), running sequentially", self.jobs, e);
                return self.run_sequential(source, page_count, on_page);
            }
        };

        // Indexed collect keeps page order regardless of completion order.
        pool.install(|| {
            (0..page_count)
                .into_par_iter()
                .map(|index| {
                    let record = self.classify_page(source, index);
                    on_page(&record);
                    record
                })
                .collect()
        })
    }

    /// Extract, normalize and classify a single page.
    pub fn classify_page<S: PageSource + ?Sized>(&self, source: &S, index: usize) -> PageRecord {
        let raw_text = self.extractor.extract(source, index);

        if let Some(dir) = &self.text_dump_dir {
            dump_page_text(dir, index, raw_text.as_str());
        }

        debug!("Page {} | text length: {}", index, raw_text.char_len());

        let (normalized_text, classification) = classify_text(&raw_text, self.rules);

        info!(
            "Page {}: classified as {} | Preview: {}...",
            index,
            classification,
            raw_text.preview(self.preview_chars)
        );

        PageRecord {
            index,
            raw_text,
            normalized_text,
            classification,
        }
    }
}

fn dump_page_text(dir: &Path, index: usize, text: &str) {
    let path = dir.join(format!("page_{}_extracted.txt", index + 1));
    if let Err(e) = std::fs::write(&path, text) {
        warn!("Failed to write {}: {}", path.display(), e);
    }
}
