//! Level 5 (record based) MAT files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use matfile::{MatFile, NumericData};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use tracing::debug;

use super::VolumeReader;

pub struct Mat5Reader;

impl VolumeReader for Mat5Reader {
    fn name(&self) -> &'static str {
        "mat-v5"
    }

    fn read(&self, path: &Path, variable: &str) -> Option<ArrayD<f64>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                debug!("mat-v5 open failed for {}: {err}", path.display());
                return None;
            }
        };
        let mat = match MatFile::parse(BufReader::new(file)) {
            Ok(mat) => mat,
            Err(err) => {
                debug!("mat-v5 parse failed for {}: {err:?}", path.display());
                return None;
            }
        };
        let Some(array) = mat.find_by_name(variable) else {
            debug!("mat-v5 {} has no variable {variable}", path.display());
            return None;
        };
        let dims = array.size().to_vec();
        let values = real_parts(array.data());
        // MATLAB stores column-major
        match ArrayD::from_shape_vec(IxDyn(&dims).f(), values) {
            Ok(array) => Some(array),
            Err(err) => {
                debug!("mat-v5 shape mismatch for {}: {err}", path.display());
                None
            }
        }
    }
}

fn real_parts(data: &NumericData) -> Vec<f64> {
    fn widen<T: Copy + Into<f64>>(values: &[T]) -> Vec<f64> {
        values.iter().map(|&v| v.into()).collect()
    }
    match data {
        NumericData::Int8 { real, .. } => widen(real),
        NumericData::UInt8 { real, .. } => widen(real),
        NumericData::Int16 { real, .. } => widen(real),
        NumericData::UInt16 { real, .. } => widen(real),
        NumericData::Int32 { real, .. } => widen(real),
        NumericData::UInt32 { real, .. } => widen(real),
        NumericData::Int64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::Single { real, .. } => widen(real),
        NumericData::Double { real, .. } => real.clone(),
    }
}
