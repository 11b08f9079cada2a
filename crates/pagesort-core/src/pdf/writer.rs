//! Writing page subsets of a document as separate PDFs.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use lopdf::Document;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{PdfDocument, Result};
use crate::error::PdfError;
use crate::group::GroupingResult;

lazy_static! {
    // Characters that are unsafe in file names on common filesystems.
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap();
}

/// Make a doc type name usable as a file stem.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned = UNSAFE_FILE_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// One written output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitOutput {
    /// Doc type name, or `None` for the unclassified bucket.
    pub doc_type: Option<String>,
    /// Path of the written PDF.
    pub path: PathBuf,
    /// Zero-based source page indices, in output order.
    pub pages: Vec<usize>,
}

/// Materializes a [`GroupingResult`] as one PDF per group.
pub struct SplitWriter<'a> {
    source: &'a PdfDocument,
    output_dir: PathBuf,
    unclassified_name: String,
}

impl<'a> SplitWriter<'a> {
    /// Create a writer that saves into `output_dir`.
    pub fn new(source: &'a PdfDocument, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            unclassified_name: "unclassified".to_string(),
        }
    }

    /// Set the file stem of the unclassified bucket.
    pub fn with_unclassified_name(mut self, name: impl Into<String>) -> Self {
        self.unclassified_name = name.into();
        self
    }

    /// Write every non-empty group, then the unclassified pages if any.
    ///
    /// Every output gets its own file. Doc types whose sanitized names clash
    /// with each other or with the unclassified bucket get a numeric suffix.
    pub fn write_all(&self, grouping: &GroupingResult) -> Result<Vec<SplitOutput>> {
        let planned = self.plan_outputs(grouping);

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| PdfError::Write(format!("{}: {}", self.output_dir.display(), e)))?;

        for output in &planned {
            self.write_pages(&output.pages, &output.path)?;
            match &output.doc_type {
                Some(_) => info!("Saved {} ({} pages)", output.path.display(), output.pages.len()),
                None => info!(
                    "Saved {} ({} unclassified pages)",
                    output.path.display(),
                    output.pages.len()
                ),
            }
        }

        Ok(planned)
    }

    /// Assign a distinct path to every output before anything is written.
    fn plan_outputs(&self, grouping: &GroupingResult) -> Vec<SplitOutput> {
        // Compared case-insensitively for case-folding filesystems.
        let mut used: HashSet<String> = HashSet::new();

        let unclassified_stem = (!grouping.unclassified.is_empty()).then(|| {
            let stem = sanitize_file_stem(&self.unclassified_name);
            used.insert(stem.to_lowercase());
            stem
        });

        let mut outputs = Vec::new();
        for group in grouping.groups.iter().filter(|g| !g.pages.is_empty()) {
            let base = sanitize_file_stem(&group.doc_type);
            let stem = unique_stem(&base, &mut used);
            if stem != base {
                warn!(
                    "Doc type '{}' would overwrite {}.pdf, writing {}.pdf instead",
                    group.doc_type, base, stem
                );
            }
            outputs.push(SplitOutput {
                doc_type: Some(group.doc_type.clone()),
                path: self.output_dir.join(format!("{}.pdf", stem)),
                pages: group.pages.clone(),
            });
        }

        if let Some(stem) = unclassified_stem {
            outputs.push(SplitOutput {
                doc_type: None,
                path: self.output_dir.join(format!("{}.pdf", stem)),
                pages: grouping.unclassified.clone(),
            });
        }

        outputs
    }

    /// Save a copy of the source containing only `pages` (ascending indices).
    pub fn write_pages(&self, pages: &[usize], path: &Path) -> Result<()> {
        let mut doc = extract_pages(self.source.document(), pages)?;
        doc.save(path)
            .map_err(|e| PdfError::Write(format!("{}: {}", path.display(), e)))?;
        debug!("Wrote pages {:?} to {}", pages, path.display());
        Ok(())
    }
}

/// `base`, or `base_2`, `base_3`, ... if already taken.
fn unique_stem(base: &str, used: &mut HashSet<String>) -> String {
    let mut stem = base.to_string();
    let mut n = 2;
    while !used.insert(stem.to_lowercase()) {
        stem = format!("{}_{}", base, n);
        n += 1;
    }
    stem
}

/// Copy `source` keeping only the pages at the given zero-based indices.
fn extract_pages(source: &Document, pages: &[usize]) -> Result<Document> {
    let all_pages = source.get_pages();
    let keep: BTreeSet<u32> = pages.iter().map(|&i| i as u32 + 1).collect();
    if let Some(&missing) = keep.iter().find(|n| !all_pages.contains_key(*n)) {
        return Err(PdfError::InvalidPage(missing as usize - 1));
    }

    let remove: Vec<u32> = all_pages
        .keys()
        .copied()
        .filter(|n| !keep.contains(n))
        .collect();

    let mut doc = source.clone();
    // lopdf keeps the page tree /Count in step while deleting.
    doc.delete_pages(&remove);
    doc.prune_objects();
    doc.renumber_objects();
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::DocGroup;
    use crate::pdf::fixtures::{build_pdf, FixturePage};
    use crate::pdf::PageSource;
    use pretty_assertions::assert_eq;

    fn sample_document() -> PdfDocument {
        let data = build_pdf(&[
            FixturePage::Text("page zero"),
            FixturePage::Text("page one"),
            FixturePage::Text("page two"),
            FixturePage::Text("page three"),
        ]);
        PdfDocument::from_bytes(&data).unwrap()
    }

    fn grouping(groups: Vec<(&str, Vec<usize>)>, unclassified: Vec<usize>) -> GroupingResult {
        GroupingResult {
            groups: groups
                .into_iter()
                .map(|(doc_type, pages)| DocGroup {
                    doc_type: doc_type.to_string(),
                    pages,
                })
                .collect(),
            unclassified,
        }
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("Invoice"), "Invoice");
        assert_eq!(sanitize_file_stem("A/B: C?"), "A_B_ C_");
        assert_eq!(sanitize_file_stem("../etc"), "_etc");
        assert_eq!(sanitize_file_stem("  "), "_");
    }

    #[test]
    fn test_writes_one_file_per_group() {
        let source = sample_document();
        let dir = tempfile::tempdir().unwrap();
        let writer = SplitWriter::new(&source, dir.path());

        let outputs = writer
            .write_all(&grouping(vec![("Invoice", vec![0, 2])], vec![1, 3]))
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].path, dir.path().join("Invoice.pdf"));
        assert_eq!(outputs[1].path, dir.path().join("unclassified.pdf"));
        assert_eq!(outputs[1].doc_type, None);

        let invoice = PdfDocument::open(&outputs[0].path).unwrap();
        assert_eq!(invoice.page_count(), 2);
        assert!(invoice.page_text(0).unwrap().contains("page zero"));
        assert!(invoice.page_text(1).unwrap().contains("page two"));

        let unclassified = PdfDocument::open(&outputs[1].path).unwrap();
        assert_eq!(unclassified.page_count(), 2);
    }

    #[test]
    fn test_no_unclassified_file_when_all_matched() {
        let source = sample_document();
        let dir = tempfile::tempdir().unwrap();
        let writer = SplitWriter::new(&source, dir.path());

        let outputs = writer
            .write_all(&grouping(vec![("A", vec![0, 1]), ("B", vec![2, 3])], vec![]))
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(!dir.path().join("unclassified.pdf").exists());
    }

    #[test]
    fn test_empty_group_skipped() {
        let source = sample_document();
        let dir = tempfile::tempdir().unwrap();
        let writer = SplitWriter::new(&source, dir.path()).with_unclassified_name("other");

        let outputs = writer
            .write_all(&grouping(vec![("Empty", vec![])], vec![0, 1, 2, 3]))
            .unwrap();

        assert_eq!(outputs.len(), 1);
        assert!(!dir.path().join("Empty.pdf").exists());
        assert_eq!(outputs[0].path, dir.path().join("other.pdf"));
    }

    #[test]
    fn test_clashing_names_get_distinct_files() {
        let source = sample_document();
        let dir = tempfile::tempdir().unwrap();
        let writer = SplitWriter::new(&source, dir.path());

        let outputs = writer
            .write_all(&grouping(
                vec![("A/B", vec![0]), ("A_B", vec![1]), ("unclassified", vec![2])],
                vec![3],
            ))
            .unwrap();

        let names: Vec<_> = outputs
            .iter()
            .map(|o| o.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["A_B.pdf", "A_B_2.pdf", "unclassified_2.pdf", "unclassified.pdf"]
        );

        for (output, text) in outputs
            .iter()
            .zip(["page zero", "page one", "page two", "page three"])
        {
            let doc = PdfDocument::open(&output.path).unwrap();
            assert_eq!(doc.page_count(), 1);
            assert!(doc.page_text(0).unwrap().contains(text), "{:?}", output.path);
        }
    }

    #[test]
    fn test_doc_type_keeps_unclassified_name_when_bucket_empty() {
        let source = sample_document();
        let dir = tempfile::tempdir().unwrap();
        let writer = SplitWriter::new(&source, dir.path());

        let outputs = writer
            .write_all(&grouping(vec![("Unclassified", vec![0, 1, 2, 3])], vec![]))
            .unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].path, dir.path().join("Unclassified.pdf"));
    }

    #[test]
    fn test_case_only_clash_suffixed() {
        let source = sample_document();
        let dir = tempfile::tempdir().unwrap();
        let writer = SplitWriter::new(&source, dir.path()).with_unclassified_name("other");

        let outputs = writer
            .write_all(&grouping(vec![("Memo", vec![0]), ("MEMO", vec![1])], vec![2, 3]))
            .unwrap();

        assert_eq!(outputs[0].path, dir.path().join("Memo.pdf"));
        assert_eq!(outputs[1].path, dir.path().join("MEMO_2.pdf"));
        assert_eq!(outputs[2].path, dir.path().join("other.pdf"));
    }

    #[test]
    fn test_page_count_rewritten() {
        let source = sample_document();
        let doc = extract_pages(source.document(), &[1, 3]).unwrap();
        assert_eq!(doc.get_pages().len(), 2);

        let root = doc
            .catalog()
            .unwrap()
            .get(b"Pages")
            .unwrap()
            .as_reference()
            .unwrap();
        let count = doc
            .get_dictionary(root)
            .unwrap()
            .get(b"Count")
            .unwrap()
            .as_i64()
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_invalid_page_rejected() {
        let source = sample_document();
        assert!(matches!(
            extract_pages(source.document(), &[0, 9]),
            Err(PdfError::InvalidPage(9))
        ));
    }
}
