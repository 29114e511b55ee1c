//! Category resolution for transactions.
//!
//! Resolution order: learned overrides (exact merchant-key lookup) beat the
//! ordered keyword rule table, which beats the "Uncategorized" fallback. The
//! resolver never writes; [`record_correction`] is the only writer to the
//! override store.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::store::FeedbackStore;

/// Fallback label when no override or rule matches
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One keyword → category rule. Rules are an ordered list; the first rule
/// whose keyword appears in the merchant key wins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRule {
    pub keyword: String,
    pub category: String,
}

/// Built-in keyword table, in priority order
const DEFAULT_RULES: &[(&str, &str)] = &[
    ("uber", "Transport"),
    ("taxi", "Transport"),
    ("train", "Transport"),
    ("metro", "Transport"),
    ("spotify", "Subscriptions"),
    ("netflix", "Subscriptions"),
    ("youtube", "Subscriptions"),
    ("apple music", "Subscriptions"),
    ("grocery", "Groceries"),
    ("supermarket", "Groceries"),
    ("walmart", "Groceries"),
    ("costco", "Groceries"),
    ("starbucks", "Coffee"),
    ("mcdonald", "Eating Out"),
    ("kfc", "Eating Out"),
    ("restaurant", "Eating Out"),
    ("rent", "Housing"),
    ("mortgage", "Housing"),
    ("electric", "Utilities"),
    ("water", "Utilities"),
    ("gas", "Utilities"),
];

/// The built-in rule table as an owned, extendable list
pub fn default_rules() -> Vec<CategoryRule> {
    DEFAULT_RULES
        .iter()
        .map(|(keyword, category)| CategoryRule {
            keyword: (*keyword).to_string(),
            category: (*category).to_string(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rule: Vec<CategoryRule>,
}

/// Load user rules from a TOML file of `[[rule]]` tables.
///
/// User rules are intended to be consulted before the built-in table; append
/// `default_rules()` to the returned list to get the full resolution order.
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<CategoryRule>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let parsed: RulesFile = toml::from_str(&text).map_err(|e| Error::Rules(e.to_string()))?;
    debug!(
        path = %path.as_ref().display(),
        rules = parsed.rule.len(),
        "loaded user rules"
    );
    Ok(parsed.rule)
}

/// Resolve the category for a merchant key.
///
/// Pure function of the key, the override store contents, and the rule list;
/// calling it twice with unchanged inputs yields the same answer.
pub fn resolve(
    merchant_key: &str,
    overrides: &dyn FeedbackStore,
    rules: &[CategoryRule],
) -> String {
    if let Some(category) = overrides.get(merchant_key) {
        return category;
    }
    for rule in rules {
        if merchant_key.contains(&rule.keyword) {
            return rule.category.clone();
        }
    }
    UNCATEGORIZED.to_string()
}

/// Fill in missing categories across a batch.
///
/// Transactions that already carry a source-provided category keep it.
pub fn categorize(
    transactions: Vec<Transaction>,
    overrides: &dyn FeedbackStore,
    rules: &[CategoryRule],
) -> Vec<Transaction> {
    let mut assigned = 0usize;
    let transactions: Vec<Transaction> = transactions
        .into_iter()
        .map(|mut tx| {
            if tx.category.is_none() {
                tx.category = Some(resolve(&tx.merchant_key, overrides, rules));
                assigned += 1;
            }
            tx
        })
        .collect();
    debug!(assigned, total = transactions.len(), "categorized batch");
    transactions
}

/// Record a user correction: the sole writer to the override store.
///
/// Observably idempotent: writing a pair that is already present is a no-op.
pub fn record_correction(
    store: &dyn FeedbackStore,
    merchant_key: &str,
    category: &str,
) -> Result<()> {
    if store.get(merchant_key).as_deref() == Some(category) {
        return Ok(());
    }
    store.put(merchant_key, category)
}
