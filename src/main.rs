//! Caiman CLI - MicroPython firmware build orchestrator
//!
//! Entry point for the caiman command-line application.

use anyhow::Result;
use clap::Parser;

use caiman::cli::output::{display_error, OutputConfig};
use caiman::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);
    output_config.apply_global();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(output_config.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.run().await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
