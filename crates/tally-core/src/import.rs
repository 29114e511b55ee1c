//! Import pipeline: delimited UTF-8 text in, normalized transactions out.
//!
//! Reads the file headerless and flexible (arbitrary column counts), decides
//! whether the first physical row is a header, infers the column mapping,
//! then normalizes every data row. Row-level parse failures become warnings;
//! an unresolvable schema or a batch with zero valid rows is a typed error.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{ColumnMapping, RowWarning, Transaction};
use crate::normalize::{self, NormalizeConfig};
use crate::schema::{self, InferenceConfig};

/// Import configuration: explicit parameters, never global state
#[derive(Debug, Clone, Default)]
pub struct ImportConfig {
    pub normalize: NormalizeConfig,
    pub inference: InferenceConfig,
}

/// Result of a successful import
#[derive(Debug, Clone)]
pub struct Import {
    /// Normalized transactions, in input row order
    pub transactions: Vec<Transaction>,
    /// Rows that were dropped, with reasons
    pub warnings: Vec<RowWarning>,
    /// The column mapping the batch was normalized under
    pub mapping: ColumnMapping,
}

/// Import a CSV file from disk
pub fn from_path(path: impl AsRef<Path>, config: &ImportConfig) -> Result<Import> {
    let file = File::open(path.as_ref())?;
    from_reader(file, config)
}

/// Import CSV text already held in memory
pub fn from_text(text: &str, config: &ImportConfig) -> Result<Import> {
    from_reader(text.as_bytes(), config)
}

/// Import CSV data from any reader
pub fn from_reader<R: Read>(reader: R, config: &ImportConfig) -> Result<Import> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records: Vec<StringRecord> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        // Some exports pad the top of the file with blank lines
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        records.push(record);
    }
    if records.is_empty() {
        return Err(Error::EmptyBatch("input contains no data rows".to_string()));
    }

    // The header row is optional. Treat the first row as headers only if it
    // names at least one known column; otherwise everything is data and
    // content inference carries the mapping.
    let (headers, data): (Vec<String>, &[StringRecord]) =
        if schema::looks_like_header(&records[0]) {
            let headers = records[0].iter().map(|s| s.trim().to_string()).collect();
            (headers, &records[1..])
        } else {
            (Vec::new(), &records[..])
        };
    if data.is_empty() {
        return Err(Error::EmptyBatch(
            "input contains a header but no data rows".to_string(),
        ));
    }

    let mapping = schema::infer(&headers, data, &config.inference)?;
    let (transactions, warnings) = normalize::normalize(data, &mapping, &config.normalize);

    if transactions.is_empty() {
        return Err(Error::EmptyBatch(format!(
            "all {} data row(s) failed normalization",
            warnings.len()
        )));
    }

    info!(
        transactions = transactions.len(),
        warnings = warnings.len(),
        "import complete"
    );
    Ok(Import {
        transactions,
        warnings,
        mapping,
    })
}
