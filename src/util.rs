//! # Utility Module
//!
//! Glue between the CLI, the loaded configuration and the scratch directory.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::cli::{CliOptions, LogFormatArg, StoreArg};
use crate::config::{Config, LogFormat, StoreBackend};
use crate::tasks::has_extension;

/// Convert CLI log format to the config enum
pub fn log_format_from_cli(format: LogFormatArg) -> LogFormat {
    match format {
        LogFormatArg::Csv => LogFormat::Csv,
        LogFormatArg::Jsonl => LogFormat::Jsonl,
    }
}

/// Convert CLI store backend to the config enum
pub fn store_backend_from_cli(store: StoreArg) -> StoreBackend {
    match store {
        StoreArg::Command => StoreBackend::Command,
        StoreArg::Local => StoreBackend::Local,
    }
}

/// Apply command-line overrides on top of the file configuration.
pub fn apply_cli_overrides(cfg: &mut Config, opts: &CliOptions) {
    if let Some(path) = &opts.source_root {
        cfg.source_root = path.clone();
    }
    if let Some(path) = &opts.scratch_dir {
        cfg.scratch_dir = path.clone();
    }
    if let Some(path) = &opts.metadata {
        cfg.metadata_path = path.clone();
    }
    if let Some(column) = &opts.qc_column {
        cfg.qc_column = column.clone();
    }
    if let Some(frames) = opts.target_frames {
        cfg.target_frames = frames;
    }
    if let Some(dest) = &opts.remote_dest {
        cfg.remote_dest = dest.clone();
    }
    if let Some(workers) = opts.workers {
        cfg.workers = workers;
    }
    if let Some(format) = opts.log_format {
        cfg.log_format = log_format_from_cli(format);
    }
    if let Some(store) = opts.store {
        cfg.store.backend = store_backend_from_cli(store);
    }
    if let Some(root) = &opts.local_root {
        cfg.store.local_root = root.clone();
    }
}

/// Prepare the scratch directory items write into.
///
/// Creates it if needed and proves it writable with a throwaway temp file.
/// Arrays left behind by an interrupted run are reported, not removed, since
/// the directory may be shared.
pub fn ensure_scratch_dir(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => {
            bail!("scratch path is not a directory: {}", path.display())
        }
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {
            std::fs::create_dir_all(path)
                .with_context(|| format!("creating scratch directory {}", path.display()))?;
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("inspecting scratch directory {}", path.display()));
        }
    }

    tempfile::Builder::new()
        .prefix(".mat2npy_write_check")
        .tempfile_in(path)
        .with_context(|| format!("scratch directory is not writable: {}", path.display()))?;

    let stale = stale_arrays(path)?;
    if stale > 0 {
        warn!(
            "scratch directory {} holds {stale} .npy file(s) from an earlier run",
            path.display()
        );
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode();
        if mode & 0o002 != 0 {
            warn!("scratch directory is world-writable: {}", path.display());
        }
    }

    Ok(())
}

/// Count `.npy` files directly inside `dir`.
pub fn stale_arrays(dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if entry.file_type()?.is_file() && has_extension(&name.to_string_lossy(), ".npy") {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use clap::Parser;

    #[test]
    fn cli_overrides_replace_file_values() {
        let mut cfg = config::load_config(None).expect("config").config;
        let opts = CliOptions::try_parse_from([
            "mat2npy",
            "--target-frames",
            "20",
            "--workers",
            "3",
            "--log-format",
            "jsonl",
            "--remote-dest",
            "/other",
        ])
        .expect("parse");
        apply_cli_overrides(&mut cfg, &opts);
        assert_eq!(cfg.target_frames, 20);
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.log_format, LogFormat::Jsonl);
        assert_eq!(cfg.remote_dest, "/other");
        assert_eq!(cfg.qc_column, "qc_flag");
    }

    #[test]
    fn scratch_dir_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let scratch = dir.path().join("a").join("b");
        ensure_scratch_dir(&scratch).expect("scratch");
        assert!(scratch.is_dir());
        assert_eq!(std::fs::read_dir(&scratch).expect("list").count(), 0);
    }

    #[test]
    fn scratch_path_must_be_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").expect("write");
        let err = ensure_scratch_dir(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn leftover_arrays_are_counted_not_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("1_a.npy"), b"x").expect("write");
        std::fs::write(dir.path().join("2_b.NPY"), b"x").expect("write");
        std::fs::write(dir.path().join("notes.txt"), b"x").expect("write");
        std::fs::create_dir(dir.path().join("3_c.npy")).expect("mkdir");

        assert_eq!(stale_arrays(dir.path()).expect("count"), 2);
        ensure_scratch_dir(dir.path()).expect("scratch");
        assert!(dir.path().join("1_a.npy").exists());
        assert_eq!(std::fs::read_dir(dir.path()).expect("list").count(), 4);
    }
}
