//! Command implementations for the Tally CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::debug;

use tally_core::{
    analytics, categorize, default_rules, import, load_rules, merchant_key, record_correction,
    AnalyticsConfig, AnalyticsReport, CategoryRule, ImportConfig, JsonFileStore, NormalizeConfig,
};

/// Default override-store location in the platform data directory
pub(crate) fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("overrides.json")
}

pub(crate) fn open_store(path: Option<&Path>) -> Result<JsonFileStore> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_store_path);
    debug!(path = %path.display(), "opening override store");
    JsonFileStore::open(&path)
        .with_context(|| format!("opening override store {}", path.display()))
}

/// User rules (if any) followed by the built-in table
pub(crate) fn effective_rules(rules_path: Option<&Path>) -> Result<Vec<CategoryRule>> {
    let mut rules = match rules_path {
        Some(path) => load_rules(path)
            .with_context(|| format!("loading rules from {}", path.display()))?,
        None => Vec::new(),
    };
    rules.extend(default_rules());
    Ok(rules)
}

fn import_config(currency: &str) -> ImportConfig {
    ImportConfig {
        normalize: NormalizeConfig {
            base_currency: currency.to_string(),
        },
        ..ImportConfig::default()
    }
}

pub fn cmd_import(file: &Path, currency: &str, json: bool) -> Result<()> {
    let imported = import::from_path(file, &import_config(currency))
        .with_context(|| format!("importing {}", file.display()))?;

    if json {
        let out = serde_json::json!({
            "transactions": imported.transactions,
            "warnings": imported.warnings,
            "mapping": imported.mapping,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Imported {} transaction(s) from {}",
        imported.transactions.len(),
        file.display()
    );
    if !imported.warnings.is_empty() {
        println!("Skipped {} row(s):", imported.warnings.len());
        for warning in &imported.warnings {
            println!("  row {}: {}", warning.row, warning.reason);
        }
    }
    Ok(())
}

pub fn cmd_analyze(
    file: &Path,
    currency: &str,
    rules_path: Option<&Path>,
    k: Decimal,
    json: bool,
    store_path: Option<&Path>,
) -> Result<()> {
    let imported = import::from_path(file, &import_config(currency))
        .with_context(|| format!("importing {}", file.display()))?;
    let store = open_store(store_path)?;
    let rules = effective_rules(rules_path)?;

    let transactions = categorize(imported.transactions, &store, &rules);
    let config = AnalyticsConfig {
        anomaly_k: k,
        ..AnalyticsConfig::default()
    };
    let report = analytics::analyze(&transactions, &config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    render_report(&report, imported.warnings.len());
    Ok(())
}

fn render_report(report: &AnalyticsReport, skipped_rows: usize) {
    println!("Total spent: {:.2}", report.total_spent);
    if skipped_rows > 0 {
        println!("({} source row(s) skipped during import)", skipped_rows);
    }

    println!("\nBy category:");
    for total in &report.by_category {
        println!(
            "  {:<24} {:>12.2}  ({} txns)",
            total.category, total.amount, total.transaction_count
        );
    }

    println!("\nBy month:");
    for total in &report.by_month {
        println!("  {}  {:>12.2}", total.month, total.amount);
    }

    if !report.top_merchants.is_empty() {
        println!("\nTop merchants:");
        for merchant in &report.top_merchants {
            println!(
                "  {:<24} {:>12.2}  ({} txns)",
                merchant.merchant_key, merchant.amount, merchant.transaction_count
            );
        }
    }

    if !report.recurring.is_empty() {
        println!("\nRecurring charges:");
        for charge in &report.recurring {
            println!(
                "  {:<24} ~{:.2} {} ({} charges, {} to {})",
                charge.merchant_key,
                charge.typical_amount,
                charge.cadence,
                charge.occurrences,
                charge.first_seen,
                charge.last_seen
            );
        }
    }

    if !report.anomalies.is_empty() {
        println!("\nUnusual transactions:");
        for flag in &report.anomalies {
            println!(
                "  {:<24} {:.2} in {} ({:.2} over the usual range)",
                flag.merchant_key, flag.magnitude, flag.category, flag.deviation
            );
        }
    }
}

pub fn cmd_correct(
    merchant: &str,
    category: &str,
    store_path: Option<&Path>,
) -> Result<()> {
    let store = open_store(store_path)?;
    let key = merchant_key(merchant);
    record_correction(&store, &key, category)?;
    println!("Recorded override: {} -> {}", key, category);
    Ok(())
}

pub fn cmd_rules(rules_path: Option<&Path>) -> Result<()> {
    let rules = effective_rules(rules_path)?;
    for (position, rule) in rules.iter().enumerate() {
        println!("{:>3}. {:<16} -> {}", position + 1, rule.keyword, rule.category);
    }
    println!("     (anything else) -> {}", tally_core::UNCATEGORIZED);
    Ok(())
}
