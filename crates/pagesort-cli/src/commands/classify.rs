//! Classify command - report page classifications without splitting.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use pagesort_core::{ClassificationRun, GroupingResult, PdfDocument, Pipeline, RunSummary};

use super::split::{page_line, print_pages, print_summary};
use super::{build_extractor, load_config, load_rules, PageOptions};

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    #[command(flatten)]
    pages: PageOptions,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON with every page record and the grouping
    Json,
    /// One line per page followed by a summary
    Text,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: RunSummary,
    grouping: &'a GroupingResult,
    pages: Vec<JsonPage<'a>>,
}

#[derive(Serialize)]
struct JsonPage<'a> {
    index: usize,
    page_number: usize,
    doc_type: Option<&'a str>,
    text_source: &'static str,
    normalized_text: &'a str,
}

pub async fn run(args: ClassifyArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    args.pages.apply(&mut config)?;

    let rules = load_rules(&args.pages.rules)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Classifying file: {}", args.input.display());
    let document = PdfDocument::open(&args.input)?;

    let extractor = build_extractor(&config, args.pages.no_ocr);
    let run = Pipeline::new(&rules, extractor)
        .with_jobs(config.pipeline.jobs)
        .with_preview_chars(config.output.preview_chars)
        .run(&document);

    match args.format {
        OutputFormat::Json => {
            let output = format_json(&run)?;
            if let Some(path) = &args.output {
                fs::write(path, &output)?;
                println!("{} Output written to {}", style("✓").green(), path.display());
            } else {
                println!("{}", output);
            }
        }
        OutputFormat::Text => {
            if let Some(path) = &args.output {
                fs::write(path, format_text(&run, config.output.preview_chars))?;
                println!("{} Output written to {}", style("✓").green(), path.display());
            } else {
                print_pages(&run.records, config.output.preview_chars);
                print_summary(&run.summary());
            }
        }
    }

    Ok(())
}

fn format_json(run: &ClassificationRun) -> anyhow::Result<String> {
    let output = JsonOutput {
        summary: run.summary(),
        grouping: &run.grouping,
        pages: run
            .records
            .iter()
            .map(|record| JsonPage {
                index: record.index,
                page_number: record.index + 1,
                doc_type: record.classification.doc_type(),
                text_source: record.raw_text.source_name(),
                normalized_text: &record.normalized_text,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn format_text(run: &ClassificationRun, preview_chars: usize) -> String {
    run.records
        .iter()
        .map(|record| page_line(record, preview_chars) + "\n")
        .collect()
}
