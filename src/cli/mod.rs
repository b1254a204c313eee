//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::defaults;
use commands::Commands;

/// Caiman - MicroPython firmware build orchestrator
///
/// Build MicroPython sources, resources and packages into a firmware tree and
/// deploy it to an attached board.
#[derive(Parser, Debug)]
#[command(name = "caiman")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Workspace config file; its directory is the workspace root
    #[arg(
        short,
        long,
        global = true,
        env = "CAIMAN_CONFIG",
        default_value = defaults::CONFIG_FILE
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub async fn run(self) -> Result<i32> {
        if let Some(cmd) = self.command {
            cmd.run(&self.config).await
        } else {
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(0)
        }
    }
}
