//! # Remote store
//!
//! The only capabilities the batch needs from remote storage: make sure a
//! folder exists, and put a file into it.

pub mod command;
pub mod local;

use std::path::Path;

use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

pub trait RemoteStore: Send + Sync {
    /// Create `folder` and its parents. Succeeds when it already exists.
    fn ensure_folder(&self, folder: &str) -> Result<(), StoreError>;
    /// Put `local` into `folder`, keeping its file name.
    fn upload(&self, local: &Path, folder: &str) -> Result<(), StoreError>;
}

pub fn build_store(cfg: &StoreConfig) -> Box<dyn RemoteStore> {
    match cfg.backend {
        StoreBackend::Command => Box::new(command::CommandStore::new(&cfg.program)),
        StoreBackend::Local => Box::new(local::LocalStore::new(&cfg.local_root)),
    }
}
