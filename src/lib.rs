//! Converts zipped MATLAB cine volumes into normalized, fixed-length `.npy`
//! arrays and uploads them to a remote store.

pub mod archive;
pub mod cli;
pub mod cohort;
pub mod config;
pub mod constants;
pub mod logging;
pub mod mat;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod tasks;
pub mod util;
pub mod volume;
