//! Row normalization: raw CSV records plus an inferred column mapping in,
//! canonical transactions out. Rows that fail date or amount parsing are
//! dropped with a per-row warning, never a batch failure.

use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::models::{ColumnMapping, RowWarning, Transaction};

/// Normalization settings
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// Currency assigned when the source has no currency column or the cell
    /// is empty
    pub base_currency: String,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            base_currency: "USD".to_string(),
        }
    }
}

/// Transaction direction taken from a sign-flag column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outflow,
    Inflow,
}

/// Parse a date string in various common formats
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15 (ISO)
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%d.%m.%Y", // 15.01.2024
        "%m-%d-%Y", // 01-15-2024
        "%d/%m/%Y", // 15/01/2024 (European)
        "%Y/%m/%d", // 2024/01/15
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse an amount string, handling currency symbols, thousands separators,
/// and accounting-style parentheses for negatives
pub(crate) fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .replace(['$', '€', '£', '₽', ',', ' ', '\u{a0}'], "")
        .replace('(', "-")
        .replace(')', "");

    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Interpret a sign-flag cell (debit/credit style indicator)
fn flag_direction(s: &str) -> Option<Direction> {
    match s.trim().to_lowercase().as_str() {
        "debit" | "dr" | "d" | "expense" | "withdrawal" | "charge" | "расход"
        | "списание" => Some(Direction::Outflow),
        "credit" | "cr" | "c" | "income" | "deposit" | "refund" | "доход"
        | "пополнение" => Some(Direction::Inflow),
        _ => None,
    }
}

/// Normalize raw rows into transactions using an inferred mapping.
///
/// Output preserves input row order. Warnings carry the zero-based data row
/// index and a reason including the offending cell text.
pub fn normalize(
    rows: &[StringRecord],
    mapping: &ColumnMapping,
    config: &NormalizeConfig,
) -> (Vec<Transaction>, Vec<RowWarning>) {
    let mut transactions = Vec::new();
    let mut warnings = Vec::new();

    for (row, record) in rows.iter().enumerate() {
        let date_str = record.get(mapping.date).unwrap_or("").trim();
        let Some(date) = parse_date(date_str) else {
            warnings.push(RowWarning {
                row,
                reason: format!("unparseable date: {:?}", date_str),
            });
            continue;
        };

        let amount_str = record.get(mapping.amount).unwrap_or("").trim();
        let Some(mut amount) = parse_amount(amount_str) else {
            warnings.push(RowWarning {
                row,
                reason: format!("unparseable amount: {:?}", amount_str),
            });
            continue;
        };

        // A sign-flag column overrides the raw sign. Applied exactly once,
        // here; downstream stages trust the stored sign.
        if let Some(col) = mapping.sign_flag {
            let flag = record.get(col).unwrap_or("");
            match flag_direction(flag) {
                Some(Direction::Outflow) => amount = -amount.abs(),
                Some(Direction::Inflow) => amount = amount.abs(),
                None => {} // unknown indicator, keep the raw sign
            }
        }

        let description = record
            .get(mapping.description)
            .unwrap_or("")
            .trim()
            .to_string();

        let currency = mapping
            .currency
            .and_then(|col| record.get(col))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| config.base_currency.clone());

        let category = mapping
            .category
            .and_then(|col| record.get(col))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        transactions.push(Transaction::new(date, description, amount, currency, category));
    }

    debug!(
        normalized = transactions.len(),
        skipped = warnings.len(),
        "normalized batch"
    );
    (transactions, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            date: 0,
            description: 1,
            amount: 2,
            currency: None,
            category: None,
            sign_flag: None,
        }
    }

    fn rows(data: &[&[&str]]) -> Vec<StringRecord> {
        data.iter().map(|r| StringRecord::from(r.to_vec())).collect()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("01/15/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_date("2024-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_date("15.01.2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("-123.45").unwrap(), dec!(-123.45));
        assert_eq!(parse_amount("(100.00)").unwrap(), dec!(-100.00));
        assert_eq!(parse_amount("€9.99").unwrap(), dec!(9.99));
        assert!(parse_amount("n/a").is_none());
        assert!(parse_amount("").is_none());
    }

    #[test]
    fn test_normalize_preserves_order_and_defaults_currency() {
        let data = rows(&[
            &["2024-01-05", "Netflix", "-15.00"],
            &["2024-01-02", "Paycheck", "2500.00"],
        ]);
        let config = NormalizeConfig::default();
        let (txns, warnings) = normalize(&data, &mapping(), &config);
        assert!(warnings.is_empty());
        assert_eq!(txns.len(), 2);
        // Input order preserved even though dates are out of order
        assert_eq!(txns[0].description, "Netflix");
        assert_eq!(txns[1].description, "Paycheck");
        assert_eq!(txns[0].currency, "USD");
    }

    #[test]
    fn test_bad_rows_become_warnings_not_errors() {
        let data = rows(&[
            &["2024-01-05", "Netflix", "-15.00"],
            &["garbage", "Spotify", "-9.99"],
            &["2024-01-07", "Uber", "n/a"],
        ]);
        let config = NormalizeConfig::default();
        let (txns, warnings) = normalize(&data, &mapping(), &config);
        assert_eq!(txns.len(), 1);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].row, 1);
        assert!(warnings[0].reason.contains("garbage"));
        assert_eq!(warnings[1].row, 2);
        assert!(warnings[1].reason.contains("amount"));
    }

    #[test]
    fn test_sign_flag_overrides_raw_sign() {
        let data = rows(&[
            &["2024-01-05", "ACME RENT", "1200.00", "debit"],
            &["2024-01-06", "REFUND", "-25.00", "credit"],
            &["2024-01-07", "MYSTERY", "-10.00", "pending"],
        ]);
        let m = ColumnMapping {
            sign_flag: Some(3),
            ..mapping()
        };
        let config = NormalizeConfig::default();
        let (txns, _) = normalize(&data, &m, &config);
        // debit forces outflow regardless of source sign
        assert_eq!(txns[0].amount, dec!(-1200.00));
        // credit forces inflow
        assert_eq!(txns[1].amount, dec!(25.00));
        // unknown flag keeps the raw sign
        assert_eq!(txns[2].amount, dec!(-10.00));
    }

    #[test]
    fn test_source_currency_and_category_pass_through() {
        let data = rows(&[&["2024-01-05", "Такси", "-450.00", "RUB", "Transport"]]);
        let m = ColumnMapping {
            currency: Some(3),
            category: Some(4),
            ..mapping()
        };
        let config = NormalizeConfig::default();
        let (txns, _) = normalize(&data, &m, &config);
        assert_eq!(txns[0].currency, "RUB");
        assert_eq!(txns[0].category.as_deref(), Some("Transport"));
    }
}
