//! CLI implementation for `caiman run` command
//!
//! Imports a module on the device in follow mode; the device program's exit
//! code becomes caiman's.

use std::path::Path;

use anyhow::{Context, Result};

use crate::infra::device::DeviceBridge;

use super::load_project;

/// Execute the run command, returning the remote program's exit code
pub async fn execute(config_path: &Path, module: &str) -> Result<i32> {
    let project = load_project(config_path)?;
    let device = DeviceBridge::from_config(&project.config.device);

    let code = device
        .run_module(module)
        .await
        .with_context(|| format!("Failed to run '{module}' on the device"))?;
    if code != 0 {
        tracing::warn!("'{module}' exited with status {code}");
    }
    Ok(code)
}
