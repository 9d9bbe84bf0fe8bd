//! # Cohort Filter
//!
//! Derives the set of subject ids whose quality-control flag does not mark them
//! as excluded.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CohortError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Load eligible ids from the metadata CSV at `path`.
pub fn load_eligible(
    path: &Path,
    id_column: &str,
    qc_column: &str,
    fail_value: f64,
) -> Result<HashSet<String>, CohortError> {
    let file = File::open(path)?;
    let eligible = eligible_from_reader(
        file,
        &path.display().to_string(),
        id_column,
        qc_column,
        fail_value,
    )?;
    info!(
        "cohort metadata={} qc_column={} eligible={}",
        path.display(),
        qc_column,
        eligible.len()
    );
    Ok(eligible)
}

/// Same as [`load_eligible`] over any reader. `source` only labels errors.
pub fn eligible_from_reader<R: Read>(
    reader: R,
    source: &str,
    id_column: &str,
    qc_column: &str,
    fail_value: f64,
) -> Result<HashSet<String>, CohortError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ConfigError::MissingColumn {
                column: name.to_string(),
                path: source.to_string(),
            })
    };
    let id_idx = column_index(id_column)?;
    let qc_idx = column_index(qc_column)?;

    let mut eligible = HashSet::new();
    for record in rdr.records() {
        let record = record?;
        let id = record.get(id_idx).map(str::trim).unwrap_or("");
        if id.is_empty() {
            continue;
        }
        if is_failed(record.get(qc_idx), fail_value) {
            continue;
        }
        eligible.insert(id.to_string());
    }
    Ok(eligible)
}

/// Only a numeric cell equal to the sentinel fails. Blank, NaN and text pass.
fn is_failed(cell: Option<&str>, fail_value: f64) -> bool {
    match cell.map(str::trim) {
        Some(value) if !value.is_empty() => value
            .parse::<f64>()
            .map(|v| v == fail_value)
            .unwrap_or(false),
        _ => false,
    }
}
