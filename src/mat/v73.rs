//! Version 7.3 MAT files, which are HDF5 containers.
//!
//! Decoding needs libhdf5 and is compiled in with the `mat73` feature, which is
//! on by default. A `--no-default-features` build declines every file so the
//! record-based reader stays the only strategy.

use std::path::Path;

use ndarray::ArrayD;
use tracing::debug;

use super::VolumeReader;

pub struct Mat73Reader {
    _private: (),
}

impl Mat73Reader {
    pub fn new() -> Self {
        #[cfg(not(feature = "mat73"))]
        tracing::warn!("built without the mat73 feature; v7.3 MAT files will be rejected");
        Self { _private: () }
    }
}

impl Default for Mat73Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeReader for Mat73Reader {
    fn name(&self) -> &'static str {
        "mat-v73"
    }

    #[cfg(feature = "mat73")]
    fn read(&self, path: &Path, variable: &str) -> Option<ArrayD<f64>> {
        let result = hdf5::File::open(path)
            .and_then(|file| file.dataset(variable))
            .and_then(|dataset| dataset.read_dyn::<f64>());
        match result {
            Ok(array) => Some(array),
            Err(err) => {
                debug!("mat-v73 read failed for {}: {err}", path.display());
                None
            }
        }
    }

    #[cfg(not(feature = "mat73"))]
    fn read(&self, path: &Path, _variable: &str) -> Option<ArrayD<f64>> {
        debug!("mat-v73 unavailable, declining {}", path.display());
        None
    }
}
