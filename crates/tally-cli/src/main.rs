//! Tally CLI - Spending analyzer for bank CSV exports
//!
//! Usage:
//!   tally import --file statement.csv      Import and report what normalized
//!   tally analyze --file statement.csv     Full pipeline + analytics report
//!   tally correct --merchant M --category C  Teach the categorizer
//!   tally rules                            Show the effective rule table

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Import {
            file,
            currency,
            json,
        } => commands::cmd_import(&file, &currency, json),
        Commands::Analyze {
            file,
            currency,
            rules,
            k,
            json,
        } => commands::cmd_analyze(
            &file,
            &currency,
            rules.as_deref(),
            k,
            json,
            cli.store.as_deref(),
        ),
        Commands::Correct { merchant, category } => {
            commands::cmd_correct(&merchant, &category, cli.store.as_deref())
        }
        Commands::Rules { rules } => commands::cmd_rules(rules.as_deref()),
    }
}
