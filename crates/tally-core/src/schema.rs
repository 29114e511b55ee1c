//! Column-role inference for arbitrary statement exports.
//!
//! Two passes: header-name matching against a bilingual alias table, then
//! content-based scoring for whatever required roles the headers left
//! unresolved. Ties always go to the leftmost column.

use csv::StringRecord;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ColumnMapping, ColumnRole};
use crate::normalize::{parse_amount, parse_date};

/// Thresholds for content-based column inference
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Rows sampled from the top of the file for content scoring
    pub sample_rows: usize,
    /// Fraction of non-empty values that must parse as dates
    pub date_parse_ratio: f64,
    /// Fraction of non-empty values that must parse as numbers
    pub amount_parse_ratio: f64,
    /// Distinct parsed values required for an amount column
    /// (rejects constant fee/ID columns)
    pub min_distinct_amounts: usize,
    /// Minimum average text length for a description column
    pub min_avg_desc_len: f64,
    /// Minimum distinct/total ratio for a description column
    pub min_desc_uniqueness: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            sample_rows: 100,
            date_parse_ratio: 0.7,   // 70% of values must look like dates
            amount_parse_ratio: 0.8, // numbers tolerate fewer stray cells
            min_distinct_amounts: 3,
            min_avg_desc_len: 5.0,
            min_desc_uniqueness: 0.3,
        }
    }
}

/// Known header names per role, English and Russian.
///
/// Ordered list so the matching behavior is auditable; comparison is
/// case-insensitive on both sides.
const HEADER_ALIASES: &[(ColumnRole, &[&str])] = &[
    (
        ColumnRole::Date,
        &[
            "date",
            "transaction date",
            "trans date",
            "posting date",
            "posted date",
            "post date",
            "дата",
            "дата операции",
        ],
    ),
    (
        ColumnRole::Description,
        &[
            "description",
            "details",
            "memo",
            "name",
            "payee",
            "merchant",
            "narrative",
            "описание",
        ],
    ),
    (
        ColumnRole::Amount,
        &[
            "amount",
            "sum",
            "value",
            "transaction amount",
            "сумма",
        ],
    ),
    (
        ColumnRole::Currency,
        &["currency", "curr", "currency code", "валюта"],
    ),
    (
        ColumnRole::Category,
        &["category", "cat", "категория"],
    ),
    (
        ColumnRole::SignFlag,
        &[
            "type",
            "transaction type",
            "debit/credit",
            "dr/cr",
            "dc",
            "тип",
            "тип операции",
        ],
    ),
];

/// Match a header label to a role, if any alias fits
fn header_role(header: &str) -> Option<ColumnRole> {
    let normalized = header.trim().trim_end_matches([':', '.']).to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    for (role, aliases) in HEADER_ALIASES {
        if aliases.contains(&normalized.as_str()) {
            return Some(*role);
        }
    }
    None
}

/// Whether a record looks like a header row (at least one cell matches a
/// known header alias). Used to decide if the first physical row is data.
pub(crate) fn looks_like_header(record: &StringRecord) -> bool {
    record.iter().any(|cell| header_role(cell).is_some())
}

/// Infer the column mapping for a batch of raw rows.
///
/// `headers` is empty for headerless files. Fails with a
/// [`Error::SchemaInference`] naming every required role that neither pass
/// could resolve.
pub fn infer(
    headers: &[String],
    rows: &[StringRecord],
    config: &InferenceConfig,
) -> Result<ColumnMapping> {
    let column_count = rows
        .iter()
        .map(|r| r.len())
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);

    let mut assigned: Vec<(ColumnRole, usize)> = Vec::new();
    let claimed = |assigned: &[(ColumnRole, usize)], col: usize| {
        assigned.iter().any(|(_, c)| *c == col)
    };
    let resolved = |assigned: &[(ColumnRole, usize)], role: ColumnRole| {
        assigned.iter().find(|(r, _)| *r == role).map(|(_, c)| *c)
    };

    // Pass 1: header names. First matching column wins per role; a column
    // can serve only one role.
    for (col, header) in headers.iter().enumerate() {
        if let Some(role) = header_role(header) {
            if resolved(&assigned, role).is_none() && !claimed(&assigned, col) {
                debug!(column = col, role = role.as_str(), header = %header, "header matched");
                assigned.push((role, col));
            }
        }
    }

    // Pass 2: content scoring for required roles the headers missed.
    // Resolution order matters: dates are the most recognizable shape, then
    // amounts, then free text; each claim narrows the candidates for the
    // next. The amount role runs twice: first requiring distinct values
    // (rejects constant fee/ID columns), then relaxed, so a file whose only
    // numeric column repeats one price still maps.
    let sample: Vec<&StringRecord> = rows.iter().take(config.sample_rows).collect();
    let passes = [
        (ColumnRole::Date, true),
        (ColumnRole::Amount, true),
        (ColumnRole::Amount, false),
        (ColumnRole::Description, true),
    ];
    for (role, strict) in passes {
        if resolved(&assigned, role).is_some() {
            continue;
        }
        for col in 0..column_count {
            if claimed(&assigned, col) {
                continue;
            }
            let values: Vec<&str> = sample
                .iter()
                .filter_map(|r| r.get(col))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect();
            if values.is_empty() {
                continue;
            }
            let qualifies = match role {
                ColumnRole::Date => date_column(&values, config),
                ColumnRole::Amount => amount_column(&values, config, strict),
                ColumnRole::Description => description_column(&values, config),
                _ => false,
            };
            if qualifies {
                debug!(column = col, role = role.as_str(), "content inference matched");
                assigned.push((role, col));
                break; // leftmost qualifying column wins
            }
        }
    }

    let missing: Vec<ColumnRole> =
        [ColumnRole::Date, ColumnRole::Description, ColumnRole::Amount]
            .into_iter()
            .filter(|role| resolved(&assigned, *role).is_none())
            .collect();
    if !missing.is_empty() {
        return Err(Error::SchemaInference { missing });
    }

    Ok(ColumnMapping {
        date: resolved(&assigned, ColumnRole::Date).unwrap(),
        description: resolved(&assigned, ColumnRole::Description).unwrap(),
        amount: resolved(&assigned, ColumnRole::Amount).unwrap(),
        currency: resolved(&assigned, ColumnRole::Currency),
        category: resolved(&assigned, ColumnRole::Category),
        sign_flag: resolved(&assigned, ColumnRole::SignFlag),
    })
}

fn date_column(values: &[&str], config: &InferenceConfig) -> bool {
    let parsed = values.iter().filter(|v| parse_date(v).is_some()).count();
    parsed as f64 / values.len() as f64 >= config.date_parse_ratio
}

fn amount_column(values: &[&str], config: &InferenceConfig, strict: bool) -> bool {
    let parsed: Vec<_> = values.iter().filter_map(|v| parse_amount(v)).collect();
    if (parsed.len() as f64 / values.len() as f64) < config.amount_parse_ratio {
        return false;
    }
    if !strict {
        return true;
    }
    // A real amount column varies; constant columns are fees/flags/IDs
    let mut distinct = parsed;
    distinct.sort();
    distinct.dedup();
    distinct.len() >= config.min_distinct_amounts.min(values.len())
}

fn description_column(values: &[&str], config: &InferenceConfig) -> bool {
    // Mostly-numeric columns are reference/ID fields, not merchant text
    let numeric = values.iter().filter(|v| parse_amount(v).is_some()).count();
    if numeric as f64 / values.len() as f64 > 0.5 {
        return false;
    }
    let total_len: usize = values.iter().map(|v| v.chars().count()).sum();
    if (total_len as f64 / values.len() as f64) < config.min_avg_desc_len {
        return false;
    }
    let mut distinct: Vec<&&str> = values.iter().collect();
    distinct.sort();
    distinct.dedup();
    distinct.len() as f64 / values.len() as f64 >= config.min_desc_uniqueness
}
