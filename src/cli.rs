use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LogFormatArg {
    Csv,
    Jsonl,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StoreArg {
    Command,
    Local,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Directory holding the numbered archive subfolders
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// Scratch directory for temp extraction and intermediate arrays
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Cohort metadata CSV
    #[arg(long)]
    pub metadata: Option<PathBuf>,

    /// Quality-control column in the metadata CSV
    #[arg(long)]
    pub qc_column: Option<String>,

    /// Number of frames kept per volume
    #[arg(long)]
    pub target_frames: Option<usize>,

    /// Remote destination folder
    #[arg(long)]
    pub remote_dest: Option<String>,

    /// Number of worker threads (0 = one per CPU)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Outcome log format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// Remote store backend
    #[arg(long, value_enum)]
    pub store: Option<StoreArg>,

    /// Root directory for the local store backend
    #[arg(long)]
    pub local_root: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}
