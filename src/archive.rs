//! # Archive extraction
//!
//! Pulls the single container entry out of a zip archive. Archives holding zero
//! or several candidate entries are rejected, never guessed at.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

use crate::tasks::has_extension;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("expected exactly one entry, found {0}")]
    EntryCount(usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("entry name is not usable as a file name: {0}")]
    BadEntryName(String),
}

/// Names of archive entries ending in `extension`, directories excluded.
pub fn matching_entries<R: io::Read + io::Seek>(
    archive: &ZipArchive<R>,
    extension: &str,
) -> Vec<String> {
    archive
        .file_names()
        .filter(|name| !name.ends_with('/') && has_extension(name, extension))
        .map(str::to_string)
        .collect()
}

/// Extract the only entry ending in `extension` into `dest_dir`.
///
/// The entry is written under its base name so nested paths inside the archive
/// never escape `dest_dir`.
pub fn extract_single(
    archive_path: &Path,
    extension: &str,
    dest_dir: &Path,
) -> Result<PathBuf, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let names = matching_entries(&archive, extension);
    if names.len() != 1 {
        return Err(ExtractError::EntryCount(names.len()));
    }
    let name = &names[0];

    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| ExtractError::BadEntryName(name.clone()))?;
    let target = dest_dir.join(base);

    let mut entry = archive.by_name(name)?;
    let mut out = BufWriter::new(File::create(&target)?);
    io::copy(&mut entry, &mut out)?;
    out.flush()?;
    Ok(target)
}
