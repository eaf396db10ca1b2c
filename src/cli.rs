// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for `spoolq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "spoolq",
    version,
    about = "Watch a spool directory and run each new job file through hucore, one at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Spooling directory for new job files.
    #[arg(short = 's', long, value_name = "PATH")]
    pub spooldir: PathBuf,

    /// Name of the execution resource to use (a `[resource.<name>]` section).
    #[arg(short = 'r', long, value_name = "NAME")]
    pub resource: Option<String>,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
