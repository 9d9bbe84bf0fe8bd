//! # Outcome Logger
//!
//! Writes one row per attempted item (`file_stem, status, reason`), ships the
//! log next to the converted arrays and summarises the batch.

pub mod csv;
pub mod jsonl;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::LogFormat;
use crate::pipeline::Outcome;
use crate::store::RemoteStore;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Destination for outcome rows.
pub trait OutcomeSink {
    fn record(&mut self, outcome: &Outcome) -> Result<(), ReportError>;
    fn flush(&mut self) -> Result<(), ReportError>;
}

pub fn build_sink(format: LogFormat, path: &Path) -> Result<Box<dyn OutcomeSink>, ReportError> {
    match format {
        LogFormat::Csv => Ok(Box::new(csv::CsvSink::create(path)?)),
        LogFormat::Jsonl => Ok(Box::new(jsonl::JsonlSink::create(path)?)),
    }
}

/// Write `outcomes` to `path` in the given format.
pub fn write_log(outcomes: &[Outcome], format: LogFormat, path: &Path) -> Result<(), ReportError> {
    let mut sink = build_sink(format, path)?;
    for outcome in outcomes {
        sink.record(outcome)?;
    }
    sink.flush()
}

#[derive(Debug, Clone)]
pub struct LogSummary {
    pub total: usize,
    pub ok: usize,
    pub skipped: usize,
    /// SKIP count per reason code.
    pub reasons: BTreeMap<String, usize>,
    pub log_name: String,
    /// Local copy, kept only when the upload failed.
    pub local_copy: Option<PathBuf>,
}

pub fn summarize(outcomes: &[Outcome]) -> (usize, usize, BTreeMap<String, usize>) {
    let mut reasons = BTreeMap::new();
    let mut ok = 0usize;
    for outcome in outcomes {
        if outcome.is_ok() {
            ok += 1;
        } else {
            *reasons.entry(outcome.reason.clone()).or_insert(0) += 1;
        }
    }
    (ok, outcomes.len() - ok, reasons)
}

pub struct LogSettings<'a> {
    pub scratch_dir: &'a Path,
    pub log_name: &'a str,
    pub format: LogFormat,
    pub remote_dest: &'a str,
}

/// Persist the log locally, upload it, then remove the local copy.
///
/// A failed upload keeps the local file so per-item diagnostics survive.
pub fn finalize(
    outcomes: &[Outcome],
    settings: &LogSettings<'_>,
    store: &dyn RemoteStore,
) -> Result<LogSummary, ReportError> {
    let local = settings.scratch_dir.join(settings.log_name);
    write_log(outcomes, settings.format, &local)?;

    if let Err(err) = store.ensure_folder(settings.remote_dest) {
        warn!("ensure_folder {} failed: {err}", settings.remote_dest);
    }
    let local_copy = match store.upload(&local, settings.remote_dest) {
        Ok(()) => {
            std::fs::remove_file(&local)?;
            info!("log uploaded to {}/{}", settings.remote_dest, settings.log_name);
            None
        }
        Err(err) => {
            warn!("log upload failed, kept at {}: {err}", local.display());
            Some(local)
        }
    };

    let (ok, skipped, reasons) = summarize(outcomes);
    Ok(LogSummary {
        total: outcomes.len(),
        ok,
        skipped,
        reasons,
        log_name: settings.log_name.to_string(),
        local_copy,
    })
}
