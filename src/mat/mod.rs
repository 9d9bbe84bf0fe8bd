//! # MAT readers
//!
//! MAT files come in two incompatible encodings that can only be told apart
//! by trying them. Readers are tried in order and the first one that yields
//! the requested variable wins; failures never cross a reader boundary.

pub mod v5;
pub mod v73;

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use ndarray::ArrayD;
use tracing::debug;

/// One decoding strategy for a MAT file.
pub trait VolumeReader: Send + Sync {
    fn name(&self) -> &'static str;
    /// Read `variable` as a numeric array, or `None` when this reader cannot.
    fn read(&self, path: &Path, variable: &str) -> Option<ArrayD<f64>>;
}

/// Record-based reader first, then the HDF5 reader.
pub fn default_readers() -> Vec<Box<dyn VolumeReader>> {
    vec![Box::new(v5::Mat5Reader), Box::new(v73::Mat73Reader::new())]
}

pub fn read_variable(
    readers: &[Box<dyn VolumeReader>],
    path: &Path,
    variable: &str,
) -> Option<ArrayD<f64>> {
    readers.iter().find_map(|reader| {
        match panic::catch_unwind(AssertUnwindSafe(|| reader.read(path, variable))) {
            Ok(Some(array)) => {
                debug!(
                    "{} read {} shape={:?} from {}",
                    reader.name(),
                    variable,
                    array.shape(),
                    path.display()
                );
                Some(array)
            }
            Ok(None) => None,
            Err(_) => {
                debug!("{} panicked on {}", reader.name(), path.display());
                None
            }
        }
    })
}
