//! Tally Core Library
//!
//! Shared functionality for the Tally spending analyzer:
//! - Column-role inference for arbitrary statement exports
//! - Row normalization into canonical transactions
//! - Category resolution (learned overrides + keyword rules)
//! - Descriptive analytics: totals, trends, recurring charges, anomalies
//! - Pluggable feedback store for user corrections
//!
//! The pipeline is synchronous and request-scoped: one
//! import → categorize → analyze pass per batch, with the feedback store as
//! the only state that survives between batches.

pub mod analytics;
pub mod categorize;
pub mod error;
pub mod import;
pub mod models;
pub mod normalize;
pub mod schema;
pub mod store;

pub use analytics::{analyze, analyze_with_baseline, AmountTolerance, AnalyticsConfig};
pub use categorize::{
    categorize, default_rules, load_rules, record_correction, resolve, CategoryRule,
    UNCATEGORIZED,
};
pub use error::{Error, Result};
pub use import::{Import, ImportConfig};
pub use models::{
    merchant_key, AnalyticsReport, AnomalyFlag, Cadence, CategoryTotal, ColumnMapping,
    ColumnRole, MerchantTotal, PeriodTotal, RecurringCharge, RowWarning, Transaction,
};
pub use normalize::NormalizeConfig;
pub use schema::InferenceConfig;
pub use store::{FeedbackStore, JsonFileStore, MemoryStore};
