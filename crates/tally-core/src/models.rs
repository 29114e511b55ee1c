//! Domain models for Tally

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Logical roles a source column can play in a statement export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Date,
    Description,
    Amount,
    Currency,
    Category,
    /// Debit/credit indicator column; overrides the raw amount sign
    SignFlag,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Description => "description",
            Self::Amount => "amount",
            Self::Currency => "currency",
            Self::Category => "category",
            Self::SignFlag => "sign_flag",
        }
    }
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Assignment of logical roles to source column indices.
///
/// The required roles are plain indices, so a mapping that exists is always
/// valid. Built once per input file and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: usize,
    pub description: usize,
    pub amount: usize,
    pub currency: Option<usize>,
    pub category: Option<usize>,
    pub sign_flag: Option<usize>,
}

/// A normalized financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Trimmed source text, case preserved
    pub description: String,
    /// Negative = outflow, positive = inflow/refund
    pub amount: Decimal,
    pub currency: String,
    /// Opaque label; emoji-bearing strings are allowed
    pub category: Option<String>,
    /// Lower-cased, whitespace-collapsed join key derived from `description`
    pub merchant_key: String,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        description: String,
        amount: Decimal,
        currency: String,
        category: Option<String>,
    ) -> Self {
        let merchant_key = merchant_key(&description);
        Self {
            date,
            description,
            amount,
            currency,
            category,
            merchant_key,
        }
    }

    /// Whether this transaction is an outflow (expense)
    pub fn is_outflow(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Absolute magnitude of the amount
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }
}

/// Derive the categorization/grouping key for a description.
///
/// Stable function of the description only: lower-cased, card-processor
/// punctuation (`*`, `#`) dropped, whitespace collapsed.
pub fn merchant_key(description: &str) -> String {
    description
        .to_lowercase()
        .replace(['*', '#'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-fatal problem with a single input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    /// Zero-based data row index in the source file
    pub row: usize,
    pub reason: String,
}

/// Charge cadence for a recurring-payment candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Weekly,
    Monthly,
    Yearly,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A merchant whose charges repeat with stable amount and cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringCharge {
    pub merchant_key: String,
    /// Median of the observed charge magnitudes
    pub typical_amount: Decimal,
    pub cadence: Cadence,
    pub occurrences: usize,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

/// A transaction flagged as statistically unusual for its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    /// Index of the transaction in the analyzed batch
    pub index: usize,
    pub merchant_key: String,
    pub category: String,
    pub magnitude: Decimal,
    /// median + k * stddev for the category
    pub threshold: Decimal,
    /// How far the magnitude exceeds the threshold
    pub deviation: Decimal,
}

/// Signed spend grouped by category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
    pub transaction_count: usize,
}

/// Signed spend grouped by calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotal {
    /// "YYYY-MM"
    pub month: String,
    pub amount: Decimal,
    pub transaction_count: usize,
}

/// Absolute outflow grouped by merchant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantTotal {
    pub merchant_key: String,
    pub amount: Decimal,
    pub transaction_count: usize,
}

/// Aggregate analytics for one transaction batch.
///
/// Derived data, recomputed fresh on each request; never the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Sum of outflow magnitudes over the batch
    pub total_spent: Decimal,
    pub by_category: Vec<CategoryTotal>,
    pub by_month: Vec<PeriodTotal>,
    pub top_merchants: Vec<MerchantTotal>,
    pub recurring: Vec<RecurringCharge>,
    pub anomalies: Vec<AnomalyFlag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merchant_key_is_stable() {
        assert_eq!(merchant_key("NETFLIX.COM*12345"), "netflix.com 12345");
        assert_eq!(merchant_key("  Starbucks   #1234  "), "starbucks 1234");
        assert_eq!(merchant_key("Uber  *TRIP"), "uber trip");
        // Same description always produces the same key
        assert_eq!(merchant_key("Spotify AB"), merchant_key("Spotify AB"));
    }

    #[test]
    fn test_transaction_derives_merchant_key() {
        let tx = Transaction::new(
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            "NETFLIX.COM".to_string(),
            Decimal::new(-1500, 2),
            "USD".to_string(),
            None,
        );
        assert_eq!(tx.merchant_key, "netflix.com");
        assert!(tx.is_outflow());
        assert_eq!(tx.magnitude(), Decimal::new(1500, 2));
    }
}
