//! CLI implementation for `caiman clean` command
//!
//! This module handles the CLI interface for cleaning build output.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{print_detail, print_success};
use crate::core::clean::{clean_workspace, has_build_artifacts};

use super::load_project;

/// Execute the clean command
pub async fn execute(config_path: &Path) -> Result<()> {
    let project = load_project(config_path)?;

    if !has_build_artifacts(&project.workspace) {
        print_success("Nothing to clean");
        return Ok(());
    }

    let result =
        clean_workspace(&project.workspace).with_context(|| "Failed to clean build output")?;

    if result.removed.is_empty() {
        print_success("Nothing to clean");
    } else {
        print_success("Cleaned build output:");
        for dir in &result.removed {
            print_detail(&format!("Removed {dir}/"));
        }
    }

    Ok(())
}
