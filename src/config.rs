use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("column '{column}' not found in {path}")]
    MissingColumn { column: String, path: String },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Csv,
    Jsonl,
}

impl LogFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Csv => "csv",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Command,
    Local,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub local_root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub run_id: String,
    pub source_root: PathBuf,
    pub subfolders: Vec<String>,
    pub archive_extension: String,
    pub container_extension: String,
    pub metadata_path: PathBuf,
    pub id_column: String,
    pub qc_column: String,
    pub qc_fail_value: f64,
    pub scratch_dir: PathBuf,
    pub target_frames: usize,
    /// Worker threads; 0 means one per CPU.
    pub workers: usize,
    pub remote_dest: String,
    pub log_name: String,
    pub log_format: LogFormat,
    pub store: StoreConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_frames == 0 {
            return Err(ConfigError::Invalid {
                field: "target_frames",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.subfolders.is_empty() {
            return Err(ConfigError::Invalid {
                field: "subfolders",
                reason: "at least one subfolder is required".to_string(),
            });
        }
        if self.remote_dest.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "remote_dest",
                reason: "must not be empty".to_string(),
            });
        }
        for (field, ext) in [
            ("archive_extension", &self.archive_extension),
            ("container_extension", &self.container_extension),
        ] {
            if ext.trim_start_matches('.').is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "extension must not be empty".to_string(),
                });
            }
        }
        match self.store.backend {
            StoreBackend::Command if self.store.program.trim().is_empty() => {
                Err(ConfigError::Invalid {
                    field: "store.program",
                    reason: "command backend needs a program".to_string(),
                })
            }
            StoreBackend::Local if self.store.local_root.as_os_str().is_empty() => {
                Err(ConfigError::Invalid {
                    field: "store.local_root",
                    reason: "local backend needs a root directory".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// File name of the outcome log inside the scratch dir and the remote folder.
    pub fn log_file_name(&self) -> String {
        if self.log_name.trim().is_empty() {
            format!(
                "npy_conversion_log_{}.{}",
                self.run_id,
                self.log_format.extension()
            )
        } else {
            self.log_name.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

const DEFAULT_CONFIG: &str = include_str!("../config/default.yml");

/// Load the embedded defaults, layering the file at `path` over them when given.
///
/// An override file may name only the keys it changes; nested mappings such as
/// `store` merge key by key. The hash covers the effective document.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    let mut doc: Value =
        serde_yaml::from_str(DEFAULT_CONFIG).context("parsing embedded default config")?;
    if let Some(p) = path {
        let text = std::fs::read_to_string(p)
            .with_context(|| format!("reading config {}", p.display()))?;
        let overlay: Value = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", p.display()))?;
        merge_yaml(&mut doc, overlay);
    }

    let effective = serde_yaml::to_string(&doc)?;
    let config_hash = hex::encode(Sha256::digest(effective.as_bytes()));

    let mut config: Config = serde_yaml::from_value(doc)?;
    if config.run_id.trim().is_empty() {
        config.run_id = generate_run_id();
    }

    Ok(LoadedConfig { config, config_hash })
}

fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_yaml(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn generate_run_id() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}
