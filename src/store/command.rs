//! Store backed by an external command-line client (`dx` by default).

use std::path::Path;
use std::process::{Command, Output};

use tracing::debug;

use super::{RemoteStore, StoreError};

pub struct CommandStore {
    program: String,
}

impl CommandStore {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, StoreError> {
        debug!("running {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program).args(args).output()?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(StoreError::CommandFailed {
                command: format!("{} {}", self.program, args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl RemoteStore for CommandStore {
    fn ensure_folder(&self, folder: &str) -> Result<(), StoreError> {
        self.run(&["mkdir", "-p", folder]).map(|_| ())
    }

    fn upload(&self, local: &Path, folder: &str) -> Result<(), StoreError> {
        let local = local
            .to_str()
            .ok_or_else(|| StoreError::InvalidPath(local.display().to_string()))?;
        let dest = format!("{}/", folder.trim_end_matches('/'));
        self.run(&["upload", local, "--path", &dest]).map(|_| ())
    }
}
