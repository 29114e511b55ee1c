//! Descriptive analytics over one categorized transaction batch.
//!
//! Computes totals, per-category and per-month summaries, top merchants,
//! recurring-payment candidates, and statistical anomaly flags. All monetary
//! arithmetic stays in `Decimal`; the batch is read-only input and the report
//! is recomputed fresh on every call.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use tracing::debug;

use crate::categorize::UNCATEGORIZED;
use crate::error::{Error, Result};
use crate::models::{
    AnalyticsReport, AnomalyFlag, Cadence, CategoryTotal, MerchantTotal, PeriodTotal,
    RecurringCharge, Transaction,
};

/// How close recurring charge amounts must stay to their median
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountTolerance {
    /// Fraction of the median (0.10 = ±10%)
    Relative(Decimal),
    /// Absolute currency amount
    Absolute(Decimal),
}

impl AmountTolerance {
    fn within(&self, amount: Decimal, median: Decimal) -> bool {
        let deviation = (amount - median).abs();
        match self {
            Self::Relative(fraction) => deviation <= median * *fraction,
            Self::Absolute(limit) => deviation <= *limit,
        }
    }
}

/// Analytics configuration
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Anomaly sensitivity: flag when magnitude > median + k * stddev
    pub anomaly_k: Decimal,
    /// Categories with fewer outflows than this are not anomaly-scored
    pub anomaly_min_samples: usize,
    /// Magnitudes at or below this are never flagged, whatever the stats say
    pub anomaly_min_magnitude: Decimal,
    /// Distinct months (or consistent intervals) needed to call a merchant
    /// recurring
    pub recurring_min_periods: usize,
    /// Amount stability policy for recurring detection
    pub recurring_tolerance: AmountTolerance,
    /// Merchants listed in the top-merchants table
    pub top_merchants: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            anomaly_k: Decimal::TWO,
            anomaly_min_samples: 3,
            anomaly_min_magnitude: Decimal::from(50),
            recurring_min_periods: 3,
            recurring_tolerance: AmountTolerance::Relative(Decimal::new(10, 2)), // ±10%
            top_merchants: 10,
        }
    }
}

/// Analyze a batch of transactions.
///
/// Fails only on an empty batch ([`Error::EmptyBatch`]).
pub fn analyze(transactions: &[Transaction], config: &AnalyticsConfig) -> Result<AnalyticsReport> {
    analyze_with_baseline(transactions, None, config)
}

/// Analyze a batch, scoring anomalies against a caller-supplied trailing
/// baseline window instead of the batch itself.
pub fn analyze_with_baseline(
    transactions: &[Transaction],
    baseline: Option<&[Transaction]>,
    config: &AnalyticsConfig,
) -> Result<AnalyticsReport> {
    if transactions.is_empty() {
        return Err(Error::EmptyBatch("no transactions to analyze".to_string()));
    }

    let report = AnalyticsReport {
        total_spent: total_spent(transactions),
        by_category: by_category(transactions),
        by_month: by_month(transactions),
        top_merchants: top_merchants(transactions, config.top_merchants),
        recurring: recurring(transactions, config),
        anomalies: anomalies(transactions, baseline.unwrap_or(transactions), config),
    };

    debug!(
        transactions = transactions.len(),
        categories = report.by_category.len(),
        recurring = report.recurring.len(),
        anomalies = report.anomalies.len(),
        "analytics complete"
    );
    Ok(report)
}

/// Sum of outflow magnitudes over the batch
fn total_spent(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .filter(|tx| tx.is_outflow())
        .map(|tx| tx.magnitude())
        .sum()
}

fn category_label(tx: &Transaction) -> &str {
    tx.category.as_deref().unwrap_or(UNCATEGORIZED)
}

/// Signed sums per category, largest absolute spend first, ties by name
fn by_category(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut groups: BTreeMap<&str, (Decimal, usize)> = BTreeMap::new();
    for tx in transactions {
        let entry = groups.entry(category_label(tx)).or_default();
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let mut totals: Vec<CategoryTotal> = groups
        .into_iter()
        .map(|(category, (amount, transaction_count))| CategoryTotal {
            category: category.to_string(),
            amount,
            transaction_count,
        })
        .collect();
    totals.sort_by(|a, b| {
        b.amount
            .abs()
            .cmp(&a.amount.abs())
            .then_with(|| a.category.cmp(&b.category))
    });
    totals
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Signed sums per calendar month, chronological
fn by_month(transactions: &[Transaction]) -> Vec<PeriodTotal> {
    let mut groups: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
    for tx in transactions {
        let entry = groups.entry(month_key(tx.date)).or_default();
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    // BTreeMap iteration over "YYYY-MM" keys is already chronological
    groups
        .into_iter()
        .map(|(month, (amount, transaction_count))| PeriodTotal {
            month,
            amount,
            transaction_count,
        })
        .collect()
}

/// Absolute outflow per merchant, top N
fn top_merchants(transactions: &[Transaction], limit: usize) -> Vec<MerchantTotal> {
    let mut groups: BTreeMap<&str, (Decimal, usize)> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_outflow()) {
        if tx.merchant_key.is_empty() {
            continue;
        }
        let entry = groups.entry(tx.merchant_key.as_str()).or_default();
        entry.0 += tx.magnitude();
        entry.1 += 1;
    }

    let mut totals: Vec<MerchantTotal> = groups
        .into_iter()
        .map(|(merchant_key, (amount, transaction_count))| MerchantTotal {
            merchant_key: merchant_key.to_string(),
            amount,
            transaction_count,
        })
        .collect();
    totals.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.merchant_key.cmp(&b.merchant_key))
    });
    totals.truncate(limit);
    totals
}

/// Median of a non-empty slice
fn median(values: &[Decimal]) -> Decimal {
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
    } else {
        sorted[mid]
    }
}

/// Population standard deviation
fn stddev(values: &[Decimal]) -> Decimal {
    let n = Decimal::from(values.len());
    let mean: Decimal = values.iter().copied().sum::<Decimal>() / n;
    let variance: Decimal = values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / n;
    variance.sqrt().unwrap_or(Decimal::ZERO)
}

/// Recurring-payment candidates, grouped by merchant key.
///
/// A merchant qualifies if it charges in enough distinct months with stable
/// amounts, or if its charge intervals bucket cleanly into a known cadence.
fn recurring(transactions: &[Transaction], config: &AnalyticsConfig) -> Vec<RecurringCharge> {
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_outflow()) {
        if tx.merchant_key.is_empty() {
            continue;
        }
        groups.entry(tx.merchant_key.as_str()).or_default().push(tx);
    }

    groups
        .into_iter()
        .filter_map(|(merchant, txns)| recurring_candidate(merchant, &txns, config))
        .collect()
}

fn recurring_candidate(
    merchant: &str,
    txns: &[&Transaction],
    config: &AnalyticsConfig,
) -> Option<RecurringCharge> {
    if txns.len() < config.recurring_min_periods {
        return None;
    }

    let mut sorted: Vec<&Transaction> = txns.to_vec();
    sorted.sort_by_key(|tx| tx.date);
    let first_seen = sorted.first()?.date;
    let last_seen = sorted.last()?.date;

    let magnitudes: Vec<Decimal> = sorted.iter().map(|tx| tx.magnitude()).collect();
    let typical = median(&magnitudes);
    if typical < Decimal::new(1, 2) {
        return None; // sub-cent charges are noise
    }

    let amounts_stable = magnitudes
        .iter()
        .all(|m| config.recurring_tolerance.within(*m, typical));

    // Rule 1: stable amounts across enough distinct months
    let months: std::collections::BTreeSet<String> =
        sorted.iter().map(|tx| month_key(tx.date)).collect();
    let by_months = amounts_stable && months.len() >= config.recurring_min_periods;

    // Rule 2: intervals bucket into a known cadence
    let intervals: Vec<i64> = sorted
        .windows(2)
        .map(|w| (w[1].date - w[0].date).num_days())
        .collect();
    let cadence_match = detect_cadence(&intervals, config.recurring_min_periods);

    match (by_months, cadence_match) {
        (false, None) => None,
        (_, Some(cadence)) => Some(RecurringCharge {
            merchant_key: merchant.to_string(),
            typical_amount: typical,
            cadence,
            occurrences: sorted.len(),
            first_seen,
            last_seen,
        }),
        (true, None) => Some(RecurringCharge {
            merchant_key: merchant.to_string(),
            typical_amount: typical,
            cadence: Cadence::Monthly,
            occurrences: sorted.len(),
            first_seen,
            last_seen,
        }),
    }
}

/// Bucket charge intervals into a cadence.
///
/// The average interval picks the bucket (weekly ~7d, monthly ~30d, yearly
/// ~365d); at least `min_consistent` intervals, and 70% of all of them, must
/// land inside the bucket's tolerance.
fn detect_cadence(intervals: &[i64], min_consistent: usize) -> Option<Cadence> {
    if intervals.is_empty() {
        return None;
    }
    let avg = intervals.iter().sum::<i64>() as f64 / intervals.len() as f64;

    let (cadence, expected, tolerance) = if avg < 10.0 {
        (Cadence::Weekly, 7.0, 3.0)
    } else if avg < 45.0 {
        (Cadence::Monthly, 30.0, 7.0)
    } else if avg < 400.0 {
        (Cadence::Yearly, 365.0, 30.0)
    } else {
        return None;
    };

    let consistent = intervals
        .iter()
        .filter(|&&days| (days as f64 - expected).abs() <= tolerance)
        .count();

    if consistent >= min_consistent && consistent as f64 / intervals.len() as f64 >= 0.7 {
        Some(cadence)
    } else {
        None
    }
}

/// Per-category anomaly flags over outflow magnitudes.
///
/// Statistics come from `stats_source`: the batch itself, or a trailing
/// baseline window when the caller supplies one. Uses median + k *
/// population stddev; categories with too few samples are skipped rather
/// than flagged on a thin statistical basis.
fn anomalies(
    transactions: &[Transaction],
    stats_source: &[Transaction],
    config: &AnalyticsConfig,
) -> Vec<AnomalyFlag> {
    let mut samples: BTreeMap<&str, Vec<Decimal>> = BTreeMap::new();
    for tx in stats_source.iter().filter(|tx| tx.is_outflow()) {
        samples
            .entry(category_label(tx))
            .or_default()
            .push(tx.magnitude());
    }

    let mut thresholds: BTreeMap<&str, Decimal> = BTreeMap::new();
    for (&category, magnitudes) in &samples {
        if magnitudes.len() < config.anomaly_min_samples {
            debug!(
                category,
                samples = magnitudes.len(),
                "skipping anomaly scoring, insufficient samples"
            );
            continue;
        }
        let threshold = median(magnitudes) + config.anomaly_k * stddev(magnitudes);
        thresholds.insert(category, threshold);
    }

    let mut flags = Vec::new();
    for (index, tx) in transactions.iter().enumerate() {
        if !tx.is_outflow() {
            continue;
        }
        let Some(&threshold) = thresholds.get(category_label(tx)) else {
            continue;
        };
        let magnitude = tx.magnitude();
        if magnitude > threshold && magnitude > config.anomaly_min_magnitude {
            flags.push(AnomalyFlag {
                index,
                merchant_key: tx.merchant_key.clone(),
                category: category_label(tx).to_string(),
                magnitude,
                threshold,
                deviation: magnitude - threshold,
            });
        }
    }

    flags.sort_by(|a, b| b.magnitude.cmp(&a.magnitude).then_with(|| a.index.cmp(&b.index)));
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(date: &str, description: &str, amount: Decimal, category: &str) -> Transaction {
        Transaction::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description.to_string(),
            amount,
            "USD".to_string(),
            Some(category.to_string()),
        )
    }

    #[test]
    fn test_empty_batch_is_a_typed_failure() {
        let err = analyze(&[], &AnalyticsConfig::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyBatch(_)));
    }

    #[test]
    fn test_category_totals_partition_total_spend() {
        let batch = vec![
            tx("2024-01-05", "Netflix", dec!(-15.00), "Subscriptions"),
            tx("2024-01-06", "Corner Grocery", dec!(-42.17), "Groceries"),
            tx("2024-01-09", "Uber", dec!(-13.40), "Transport"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        assert_eq!(report.total_spent, dec!(70.57));
        let category_sum: Decimal = report.by_category.iter().map(|c| c.amount.abs()).sum();
        assert_eq!(category_sum, report.total_spent);
    }

    #[test]
    fn test_category_totals_sorted_by_absolute_spend_then_name() {
        let batch = vec![
            tx("2024-01-05", "A", dec!(-10.00), "Alpha"),
            tx("2024-01-06", "B", dec!(-30.00), "Beta"),
            tx("2024-01-07", "C", dec!(-10.00), "Gamma"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        let names: Vec<&str> = report.by_category.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Alpha", "Gamma"]);
    }

    #[test]
    fn test_monthly_totals_are_chronological() {
        let batch = vec![
            tx("2024-03-05", "C", dec!(-10.00), "X"),
            tx("2024-01-05", "A", dec!(-10.00), "X"),
            tx("2024-02-05", "B", dec!(-10.00), "X"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        let months: Vec<&str> = report.by_month.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
    }

    #[test]
    fn test_inflows_excluded_from_total_and_top_merchants() {
        let batch = vec![
            tx("2024-01-05", "Netflix", dec!(-15.00), "Subscriptions"),
            tx("2024-01-02", "Paycheck", dec!(2500.00), "Income"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        assert_eq!(report.total_spent, dec!(15.00));
        assert_eq!(report.top_merchants.len(), 1);
        assert_eq!(report.top_merchants[0].merchant_key, "netflix");
    }

    #[test]
    fn test_recurring_monthly_merchant_is_flagged() {
        // Same merchant, amounts within ±5%, the 1st of four consecutive months
        let batch = vec![
            tx("2024-01-01", "Netflix", dec!(-15.00), "Subscriptions"),
            tx("2024-02-01", "Netflix", dec!(-15.49), "Subscriptions"),
            tx("2024-03-01", "Netflix", dec!(-14.99), "Subscriptions"),
            tx("2024-04-01", "Netflix", dec!(-15.00), "Subscriptions"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        assert_eq!(report.recurring.len(), 1);
        let candidate = &report.recurring[0];
        assert_eq!(candidate.merchant_key, "netflix");
        assert_eq!(candidate.cadence, Cadence::Monthly);
        assert_eq!(candidate.occurrences, 4);
        assert_eq!(candidate.typical_amount, dec!(15.00));
    }

    #[test]
    fn test_one_off_purchase_is_not_recurring() {
        let batch = vec![
            tx("2024-01-15", "Laptop Store", dec!(-1999.00), "Shopping"),
            tx("2024-01-05", "Netflix", dec!(-15.00), "Subscriptions"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        assert!(report.recurring.is_empty());
    }

    #[test]
    fn test_irregular_spend_with_varying_amounts_is_not_recurring() {
        // Four distinct months but wildly different amounts and scattered
        // intervals: neither rule should fire
        let batch = vec![
            tx("2024-01-03", "Corner Grocery", dec!(-12.00), "Groceries"),
            tx("2024-02-20", "Corner Grocery", dec!(-80.00), "Groceries"),
            tx("2024-03-02", "Corner Grocery", dec!(-31.00), "Groceries"),
            tx("2024-04-27", "Corner Grocery", dec!(-150.00), "Groceries"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        assert!(report.recurring.is_empty());
    }

    #[test]
    fn test_anomaly_flags_the_outlier_only() {
        // Nine 20s and one 200 in the same category
        let mut batch: Vec<Transaction> = (1..=9)
            .map(|day| {
                tx(
                    &format!("2024-01-{:02}", day),
                    "Lunch Spot",
                    dec!(-20.00),
                    "Food",
                )
            })
            .collect();
        batch.push(tx("2024-01-10", "Fancy Dinner", dec!(-200.00), "Food"));

        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        assert_eq!(report.anomalies.len(), 1);
        let flag = &report.anomalies[0];
        assert_eq!(flag.index, 9);
        assert_eq!(flag.merchant_key, "fancy dinner");
        assert_eq!(flag.magnitude, dec!(200.00));
        assert!(flag.deviation > Decimal::ZERO);
        assert!(flag.threshold < dec!(200.00));
    }

    #[test]
    fn test_small_categories_are_skipped_for_anomalies() {
        // Two transactions in a category: below the minimum sample count,
        // so even a huge outlier is not flagged
        let batch = vec![
            tx("2024-01-05", "Vet Visit", dec!(-20.00), "Pets"),
            tx("2024-01-20", "Emergency Vet", dec!(-900.00), "Pets"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_anomaly_floor_suppresses_small_magnitudes() {
        // Statistically an outlier, but under the reporting floor
        let batch = vec![
            tx("2024-01-01", "Bus", dec!(-2.00), "Transport"),
            tx("2024-01-02", "Bus", dec!(-2.00), "Transport"),
            tx("2024-01-03", "Bus", dec!(-2.00), "Transport"),
            tx("2024-01-04", "Airport Train", dec!(-14.00), "Transport"),
        ];
        let report = analyze(&batch, &AnalyticsConfig::default()).unwrap();
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_caller_supplied_baseline_drives_anomaly_stats() {
        // Against itself the current batch looks uniform; against the calmer
        // baseline window every one of its charges is unusual
        let baseline: Vec<Transaction> = (1..=5)
            .map(|day| {
                tx(
                    &format!("2023-12-{:02}", day),
                    "Lunch Spot",
                    dec!(-20.00),
                    "Food",
                )
            })
            .collect();
        let current = vec![
            tx("2024-01-05", "Steakhouse", dec!(-200.00), "Food"),
            tx("2024-01-12", "Steakhouse", dec!(-210.00), "Food"),
            tx("2024-01-19", "Steakhouse", dec!(-205.00), "Food"),
        ];

        let config = AnalyticsConfig::default();
        let self_scored = analyze(&current, &config).unwrap();
        assert!(self_scored.anomalies.is_empty());

        let baseline_scored =
            analyze_with_baseline(&current, Some(&baseline), &config).unwrap();
        assert_eq!(baseline_scored.anomalies.len(), 3);
    }

    #[test]
    fn test_absolute_recurring_tolerance() {
        let config = AnalyticsConfig {
            recurring_tolerance: AmountTolerance::Absolute(dec!(1.00)),
            ..AnalyticsConfig::default()
        };
        let batch = vec![
            tx("2024-01-01", "Gym", dec!(-40.00), "Fitness"),
            tx("2024-02-01", "Gym", dec!(-40.75), "Fitness"),
            tx("2024-03-01", "Gym", dec!(-39.50), "Fitness"),
        ];
        let report = analyze(&batch, &config).unwrap();
        assert_eq!(report.recurring.len(), 1);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[dec!(1), dec!(3), dec!(2)]), dec!(2));
        assert_eq!(median(&[dec!(1), dec!(2), dec!(3), dec!(4)]), dec!(2.5));
    }
}
