//! # Volume transforms
//!
//! Min-max normalization and index-based temporal subsampling of cine volumes
//! laid out as frames × height × width.

use ndarray::{Array3, ArrayD, Axis, Ix3};

pub type Volume = Array3<f32>;

/// Reasons a raw array cannot become a [`Volume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Rank(usize),
    TooFewFrames { frames: usize, required: usize },
}

/// Cast a parsed array to `f32` and check it is 3-D with at least
/// `min_frames` frames.
pub fn to_volume(raw: ArrayD<f64>, min_frames: usize) -> Result<Volume, ShapeError> {
    if raw.ndim() != 3 {
        return Err(ShapeError::Rank(raw.ndim()));
    }
    let frames = raw.shape()[0];
    if frames < min_frames {
        return Err(ShapeError::TooFewFrames {
            frames,
            required: min_frames,
        });
    }
    raw.mapv(|v| v as f32)
        .into_dimensionality::<Ix3>()
        .map_err(|_| ShapeError::Rank(3))
}

/// Global min and max over finite samples. `(INFINITY, NEG_INFINITY)` when
/// there are none.
pub fn min_max(volume: &Volume) -> (f32, f32) {
    volume
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Scale in place to [0, 1]. Returns `false` and leaves the data untouched when
/// the volume is flat (`max <= min` over finite samples, which includes input
/// with no finite sample at all).
///
/// Non-finite samples (NaN, ±Inf) are written as 0.0.
pub fn normalize(volume: &mut Volume) -> bool {
    let (lo, hi) = min_max(volume);
    if !(hi > lo) {
        return false;
    }
    let range = hi - lo;
    volume.mapv_inplace(|v| {
        if v.is_finite() {
            ((v - lo) / range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    });
    true
}

/// Frame indices kept when reducing `frames` to `target`.
///
/// Evenly spaced over `[0, frames - 1]`, rounded half-to-even, consecutive
/// duplicates collapsed. `frames <= target` keeps every frame.
pub fn resample_indices(frames: usize, target: usize) -> Vec<usize> {
    if frames <= target {
        return (0..frames).collect();
    }
    if target <= 1 {
        return vec![0];
    }
    let last = (frames - 1) as f64;
    let step = last / (target - 1) as f64;
    let mut indices: Vec<usize> = (0..target)
        .map(|i| {
            let pos = if i == target - 1 { last } else { i as f64 * step };
            pos.round_ties_even() as usize
        })
        .collect();
    indices.dedup();
    indices
}

/// Subsample the frame axis down to at most `target` frames.
pub fn resample(volume: Volume, target: usize) -> Volume {
    let frames = volume.len_of(Axis(0));
    if frames <= target {
        return volume;
    }
    let indices = resample_indices(frames, target);
    volume.select(Axis(0), &indices)
}
