//! # Item Pipeline
//!
//! Converts one archive into one normalized volume upload and reports the
//! result as an [`Outcome`]. Every failure, panics included, becomes a SKIP
//! outcome so a bad item can never abort the batch.
//!
//! Stages: `Start -> Extracted -> Parsed -> Normalized -> Resampled ->
//! SavedLocal -> Uploaded`. The item temp dir and the local `.npy` are owned
//! by drop guards and removed on every exit path.

pub mod workers;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{self, ExtractError};
use crate::config::Config;
use crate::constants::VOLUME_VARIABLE;
use crate::mat::{self, VolumeReader};
use crate::store::RemoteStore;
use crate::tasks::WorkItem;
use crate::volume;

pub use workers::run_batch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Skip,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("OK"),
            Status::Skip => f.write_str("SKIP"),
        }
    }
}

/// Why an item was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Archive held this many container entries instead of exactly one.
    MatCount(usize),
    InvalidVolume,
    FlatVolume,
    UploadFailed,
    Exception(String),
}

impl SkipReason {
    fn exception(err: impl fmt::Display) -> Self {
        SkipReason::Exception(err.to_string())
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MatCount(_) => f.write_str("mat_count≠1"),
            SkipReason::InvalidVolume => write!(f, "{VOLUME_VARIABLE}_invalid"),
            SkipReason::FlatVolume => f.write_str("flat_volume"),
            SkipReason::UploadFailed => f.write_str("upload_failed"),
            SkipReason::Exception(detail) => {
                write!(f, "exception:{}", detail.replace(['\n', '\r'], " "))
            }
        }
    }
}

/// Result row for one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    #[serde(rename = "file_stem")]
    pub stem: String,
    pub status: Status,
    /// Empty on OK, reason code on SKIP.
    pub reason: String,
}

impl Outcome {
    pub fn ok(stem: &str) -> Self {
        Self {
            stem: stem.to_string(),
            status: Status::Ok,
            reason: String::new(),
        }
    }

    pub fn skip(stem: &str, reason: &SkipReason) -> Self {
        Self {
            stem: stem.to_string(),
            status: Status::Skip,
            reason: reason.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// Per-item settings, fixed for the whole batch.
#[derive(Debug, Clone)]
pub struct ItemSettings {
    pub scratch_dir: PathBuf,
    pub container_extension: String,
    pub target_frames: usize,
    pub remote_dest: String,
}

impl ItemSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            scratch_dir: cfg.scratch_dir.clone(),
            container_extension: cfg.container_extension.clone(),
            target_frames: cfg.target_frames,
            remote_dest: cfg.remote_dest.clone(),
        }
    }
}

/// Everything a worker needs to run [`process_item`]. Shared read-only.
pub struct PipelineContext {
    pub settings: ItemSettings,
    pub store: Arc<dyn RemoteStore>,
    pub readers: Vec<Box<dyn VolumeReader>>,
}

impl PipelineContext {
    pub fn new(settings: ItemSettings, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            settings,
            store,
            readers: mat::default_readers(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Extracted,
    Parsed,
    Normalized,
    Resampled,
    SavedLocal,
    Uploaded,
}

fn enter(stem: &str, stage: Stage) {
    debug!("item {stem} -> {stage:?}");
}

/// Run the full conversion for `item`. Never panics, never errors.
pub fn process_item(item: &WorkItem, ctx: &PipelineContext) -> Outcome {
    debug!("item {} -> Start ({})", item.stem, item.source.display());
    let result = panic::catch_unwind(AssertUnwindSafe(|| convert(item, ctx)));
    let outcome = match result {
        Ok(Ok(())) => Outcome::ok(&item.stem),
        Ok(Err(reason)) => Outcome::skip(&item.stem, &reason),
        Err(payload) => {
            let reason = SkipReason::Exception(panic_message(payload.as_ref()));
            warn!("item {} panicked: {reason}", item.stem);
            Outcome::skip(&item.stem, &reason)
        }
    };
    if outcome.is_ok() {
        debug!("item {} -> Done(OK)", item.stem);
    } else {
        info!("item {} skipped: {}", item.stem, outcome.reason);
    }
    outcome
}

fn convert(item: &WorkItem, ctx: &PipelineContext) -> Result<(), SkipReason> {
    let settings = &ctx.settings;

    let work_dir = tempfile::Builder::new()
        .prefix(&format!("{}_", item.stem))
        .tempdir_in(&settings.scratch_dir)
        .map_err(SkipReason::exception)?;

    let mat_path =
        archive::extract_single(&item.source, &settings.container_extension, work_dir.path())
            .map_err(|err| match err {
                ExtractError::EntryCount(count) => {
                    debug!("item {} has {count} container entries", item.stem);
                    SkipReason::MatCount(count)
                }
                other => SkipReason::exception(other),
            })?;
    enter(&item.stem, Stage::Extracted);

    let raw = mat::read_variable(&ctx.readers, &mat_path, VOLUME_VARIABLE)
        .ok_or(SkipReason::InvalidVolume)?;
    let mut vol = volume::to_volume(raw, settings.target_frames).map_err(|err| {
        debug!("item {} rejected volume: {err:?}", item.stem);
        SkipReason::InvalidVolume
    })?;
    enter(&item.stem, Stage::Parsed);

    if !volume::normalize(&mut vol) {
        return Err(SkipReason::FlatVolume);
    }
    enter(&item.stem, Stage::Normalized);

    let vol = volume::resample(vol, settings.target_frames);
    enter(&item.stem, Stage::Resampled);

    let local = ScratchFile::new(settings.scratch_dir.join(format!("{}.npy", item.stem)));
    ndarray_npy::write_npy(local.path(), &vol).map_err(SkipReason::exception)?;
    enter(&item.stem, Stage::SavedLocal);

    if let Err(err) = ctx.store.ensure_folder(&settings.remote_dest) {
        debug!("ensure_folder {} ignored error: {err}", settings.remote_dest);
    }
    ctx.store
        .upload(local.path(), &settings.remote_dest)
        .map_err(|err| {
            warn!("upload failed for {}: {err}", item.stem);
            SkipReason::UploadFailed
        })?;
    enter(&item.stem, Stage::Uploaded);

    Ok(())
}

/// Intermediate file removed when dropped.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove {}: {err}", self.path.display());
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic".to_string()
    }
}
