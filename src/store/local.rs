//! Store that mirrors the remote layout under a local directory.

use std::path::{Component, Path, PathBuf};

use super::{RemoteStore, StoreError};

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Map a remote folder such as `/processed/npy` below the root.
    pub fn folder_path(&self, folder: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(folder.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StoreError::InvalidPath(folder.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl RemoteStore for LocalStore {
    fn ensure_folder(&self, folder: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(self.folder_path(folder)?)?;
        Ok(())
    }

    fn upload(&self, local: &Path, folder: &str) -> Result<(), StoreError> {
        let dir = self.folder_path(folder)?;
        if !dir.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "folder does not exist: {folder}"
            )));
        }
        let name = local
            .file_name()
            .ok_or_else(|| StoreError::InvalidPath(local.display().to_string()))?;
        std::fs::copy(local, dir.join(name))?;
        Ok(())
    }
}
