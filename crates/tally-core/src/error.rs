//! Error types for Tally

use thiserror::Error;

use crate::models::ColumnRole;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema inference failed: could not resolve column(s): {}", join_roles(.missing))]
    SchemaInference { missing: Vec<ColumnRole> },

    #[error("empty batch: {0}")]
    EmptyBatch(String),

    #[error("rule file error: {0}")]
    Rules(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn join_roles(roles: &[ColumnRole]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
