//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Tidemark - retention sweeper for mail stores
#[derive(Debug, Parser)]
#[command(name = "tidemark")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TIDEMARK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Parse the configuration, print it and exit
    #[arg(long)]
    pub check_config: bool,
}
