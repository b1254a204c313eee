//! CLI implementation for `caiman init` command
//!
//! This module handles the CLI interface for workspace initialization.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{print_detail, print_success};
use crate::config::defaults;
use crate::core::init::{init_workspace, InitOptions};

/// Directory the config file lives in
pub(crate) fn workspace_dir(config_path: &Path) -> &Path {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Execute the init command
pub async fn execute(config_path: &Path, options: &InitOptions) -> Result<()> {
    let dir = workspace_dir(config_path);
    let result = init_workspace(dir, options)
        .with_context(|| format!("Failed to initialize workspace in {}", dir.display()))?;

    print_success(&format!(
        "Initialized caiman workspace '{}' in {}",
        result.name,
        dir.display()
    ));
    print_detail(&format!("Created {}", defaults::CONFIG_FILE));
    print_detail(&format!("Created directory: {}/", defaults::SOURCE_DIR));
    if result.gitignore_updated {
        print_detail("Updated .gitignore");
    }

    Ok(())
}
