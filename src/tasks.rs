//! # Task Enumerator
//!
//! Matches archives under the source subfolders to eligible subject ids.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// One archive to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub source: PathBuf,
    /// File name without extension; unique within a batch.
    pub stem: String,
}

/// Subject id of an archive file name: everything before the first `_`.
pub fn subject_id(file_name: &str) -> &str {
    file_name.split('_').next().unwrap_or(file_name)
}

pub fn has_extension(file_name: &str, extension: &str) -> bool {
    let ext = extension.trim_start_matches('.');
    let name = file_name.to_ascii_lowercase();
    name.len() > ext.len()
        && name.ends_with(&ext.to_ascii_lowercase())
        && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
}

pub fn enumerate(
    root: &Path,
    subfolders: &[String],
    eligible: &HashSet<String>,
    archive_extension: &str,
) -> Vec<WorkItem> {
    let mut items = Vec::new();
    let mut seen_stems = HashSet::new();

    for sub in subfolders {
        let dir = root.join(sub);
        if !dir.is_dir() {
            debug!("source subfolder missing, skipping: {}", dir.display());
            continue;
        }
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("cannot list {}: {err}", dir.display());
                continue;
            }
        };

        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("unreadable entry in {}: {err}", dir.display());
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("skipping non UTF-8 file name: {}", path.display());
                continue;
            };
            if has_extension(name, archive_extension) {
                files.push((name.to_string(), path));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut matched = 0usize;
        for (name, path) in files {
            if !eligible.contains(subject_id(&name)) {
                continue;
            }
            let stem = stem_of(&name, archive_extension);
            if !seen_stems.insert(stem.clone()) {
                warn!("duplicate stem {stem} in {}, skipping", dir.display());
                continue;
            }
            matched += 1;
            items.push(WorkItem { source: path, stem });
        }
        debug!("subfolder {} matched={}", sub, matched);
    }

    info!("enumerated {} work items under {}", items.len(), root.display());
    items
}

fn stem_of(file_name: &str, extension: &str) -> String {
    let ext_len = extension.trim_start_matches('.').len() + 1;
    file_name[..file_name.len() - ext_len].to_string()
}
