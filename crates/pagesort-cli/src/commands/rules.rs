//! Rules command - inspect rule files.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use super::load_rules;

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    command: RulesCommand,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Validate a rule file and list doc types in match priority order
    Check {
        /// Rule file (YAML)
        #[arg(default_value = "rule.yml")]
        file: PathBuf,
    },
}

pub async fn run(args: RulesArgs) -> anyhow::Result<()> {
    match args.command {
        RulesCommand::Check { file } => check(&file),
    }
}

fn check(file: &Path) -> anyhow::Result<()> {
    let rules = load_rules(file)?;

    println!(
        "{} {} is valid: {} doc types",
        style("✓").green(),
        file.display(),
        rules.len()
    );

    for (priority, rule) in rules.rules().iter().enumerate() {
        println!("{:>3}. {}", priority + 1, style(&rule.doc_type).bold());
        for keyword in &rule.keywords {
            println!("       - {}", keyword);
        }
    }

    Ok(())
}
