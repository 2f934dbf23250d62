mod commands;
mod common;

pub use commands::*;
pub use common::*;

use crate::types::{LogLevel, OutputFormat};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nodehealth")]
#[command(about = "Link, GPU and fabric health checks for GPU cluster nodes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: $NODEHEALTH_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Directory reports are written to (overrides config)
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Exit with status 2 when any unit failed
    #[arg(long, global = true)]
    pub fail_on_issues: bool,

    #[command(subcommand)]
    pub command: Commands,
}
