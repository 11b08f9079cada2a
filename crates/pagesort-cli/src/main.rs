//! CLI application for splitting PDFs by document type.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{classify, config, rules, split};

/// pagesort - Split a multi-document PDF into one file per document type
#[derive(Parser)]
#[command(name = "pagesort")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every page and write one PDF per document type
    Split(split::SplitArgs),

    /// Classify pages without writing any PDFs
    Classify(classify::ClassifyArgs),

    /// Inspect rule files
    Rules(rules::RulesArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Split(args) => split::run(args, cli.config.as_deref()).await,
        Commands::Classify(args) => classify::run(args, cli.config.as_deref()).await,
        Commands::Rules(args) => rules::run(args).await,
        Commands::Config(args) => config::run(args).await,
    }
}
