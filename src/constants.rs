//! Shared constants for the conversion pipeline.

/// Name of the cine volume variable inside every MAT file.
pub const VOLUME_VARIABLE: &str = "CI_F";

/// Job channel capacity per worker.
pub const CHANNEL_CAPACITY_MULTIPLIER: usize = 4;

/// Lower bound on the job channel capacity.
pub const MIN_CHANNEL_CAPACITY: usize = 16;

/// Completed items between progress log lines.
pub const PROGRESS_LOG_INTERVAL: usize = 100;
