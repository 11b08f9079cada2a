//! Split command - classify pages and write one PDF per document type.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use pagesort_core::{
    ClassificationRun, PageRecord, PageSource, PdfDocument, Pipeline, RunSummary, SplitOutput, SplitWriter,
};

use super::{build_extractor, load_config, load_rules, PageOptions};

/// Arguments for the split command.
#[derive(Args)]
pub struct SplitArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Directory for the split documents
    #[arg(short, long, default_value = "output_docs")]
    output_dir: PathBuf,

    #[command(flatten)]
    pages: PageOptions,

    /// Write page_<n>_extracted.txt for every page
    #[arg(long)]
    dump_text: bool,

    /// Write report.json with per-page results
    #[arg(long)]
    report: bool,
}

/// Contents of `report.json`.
#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    input: &'a Path,
    processing_time_ms: u64,
    summary: RunSummary,
    outputs: &'a [SplitOutput],
    pages: Vec<PageReport>,
}

#[derive(Serialize)]
struct PageReport {
    index: usize,
    page_number: usize,
    classification: String,
    text_source: &'static str,
    preview: String,
}

impl PageReport {
    fn new(record: &PageRecord, preview_chars: usize) -> Self {
        Self {
            index: record.index,
            page_number: record.index + 1,
            classification: record.classification.to_string(),
            text_source: record.raw_text.source_name(),
            preview: record.raw_text.preview(preview_chars),
        }
    }
}

pub async fn run(args: SplitArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.pages.apply(&mut config)?;

    // Rules are validated before any page is touched.
    let rules = load_rules(&args.pages.rules)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let document = PdfDocument::open(&args.input)?;

    fs::create_dir_all(&args.output_dir)?;

    let extractor = build_extractor(&config, args.pages.no_ocr);
    let mut pipeline = Pipeline::new(&rules, extractor)
        .with_jobs(config.pipeline.jobs)
        .with_preview_chars(config.output.preview_chars);
    if args.dump_text || config.output.dump_page_text {
        pipeline = pipeline.with_text_dump_dir(&args.output_dir);
    }

    let pb = page_progress(document.page_count() as u64)?;
    let run = pipeline.run_with_progress(&document, |_| pb.inc(1));
    pb.finish_with_message("Classified");

    let writer = SplitWriter::new(&document, &args.output_dir)
        .with_unclassified_name(config.output.unclassified_name.clone());
    let outputs = writer.write_all(&run.grouping)?;

    for output in &outputs {
        println!(
            "{} Saved: {} ({} pages)",
            style("✓").green(),
            output.path.display(),
            output.pages.len()
        );
    }

    print_pages(&run.records, config.output.preview_chars);
    print_summary(&run.summary());

    if args.report || config.output.write_report {
        let report_path = args.output_dir.join("report.json");
        write_report(&report_path, &args.input, &run, &outputs, config.output.preview_chars)?;
        println!(
            "{} Report written to {}",
            style("✓").green(),
            report_path.display()
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn page_progress(pages: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(pages);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

/// One line per page: zero-based index, outcome, text source and preview.
pub(crate) fn page_line(record: &PageRecord, preview_chars: usize) -> String {
    format!(
        "Page {}: {} [{}] | {}",
        record.index,
        record.classification,
        record.raw_text.source_name(),
        record.raw_text.preview(preview_chars)
    )
}

pub(crate) fn print_pages(records: &[PageRecord], preview_chars: usize) {
    println!();
    println!("{}", style("Document Summary").bold());
    for record in records {
        let line = page_line(record, preview_chars);
        if record.classification.is_unclassified() {
            println!("{}", style(line).yellow());
        } else {
            println!("{}", line);
        }
    }
}

pub(crate) fn print_summary(summary: &RunSummary) {
    println!();
    println!("{} Total original pages: {}", style("ℹ").blue(), summary.total_pages);
    println!("{} Classified pages: {}", style("✓").green(), summary.classified_pages);
    println!("{} Unclassified pages: {}", style("?").yellow(), summary.unclassified_pages);

    for count in &summary.doc_types {
        println!("    {}: {}", count.doc_type, count.pages);
    }

    if summary.unclassified_pages > 0 {
        println!(
            "{} {} page(s) did not match any rule ({} without text)",
            style("⚠").yellow(),
            summary.unclassified_pages,
            summary.no_text_pages
        );
    }
}

fn write_report(
    path: &Path,
    input: &Path,
    run: &ClassificationRun,
    outputs: &[SplitOutput],
    preview_chars: usize,
) -> anyhow::Result<()> {
    let report = Report {
        generated_at: chrono::Local::now().to_rfc3339(),
        input,
        processing_time_ms: run.processing_time_ms,
        summary: run.summary(),
        outputs,
        pages: run
            .records
            .iter()
            .map(|record| PageReport::new(record, preview_chars))
            .collect(),
    };
    fs::write(path, serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
