//! CLI argument definitions

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Spending analyzer for bank CSV exports"
)]
pub struct Cli {
    /// Path to the category override store
    /// (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a CSV export and report what normalized
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Currency assumed when the file carries none
        #[arg(long, default_value = "USD")]
        currency: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run the full import → categorize → analyze pipeline
    Analyze {
        /// CSV file to analyze
        #[arg(short, long)]
        file: PathBuf,

        /// Currency assumed when the file carries none
        #[arg(long, default_value = "USD")]
        currency: String,

        /// Extra category rules (TOML), consulted before the built-ins
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Anomaly sensitivity: flag above median + k * stddev
        #[arg(long, default_value = "2")]
        k: Decimal,

        /// Emit the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a category correction for a merchant
    Correct {
        /// Merchant text as it appears on the statement
        #[arg(short, long)]
        merchant: String,

        /// Category to assign from now on
        #[arg(short, long)]
        category: String,
    },

    /// Print the effective category rule table in priority order
    Rules {
        /// Extra category rules (TOML), consulted before the built-ins
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}
