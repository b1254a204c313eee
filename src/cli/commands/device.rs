//! CLI implementation for `caiman device` commands
//!
//! Thin wrappers over the device filesystem helpers.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::output::{is_json, print_detail, print_success};
use crate::infra::device::DeviceBridge;
use crate::infra::remote_fs::RemoteFs;

use super::{load_project, DeviceCommands};

fn print_paths(paths: &[String]) {
    if is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(paths).unwrap_or_default()
        );
    } else {
        for path in paths {
            println!("{path}");
        }
    }
}

/// Execute a device subcommand
pub async fn execute(config_path: &Path, command: DeviceCommands) -> Result<()> {
    let project = load_project(config_path)?;
    let device = DeviceBridge::from_config(&project.config.device);
    let fs = RemoteFs::new(&device, project.workspace.artifact_root().join("remote"));

    match command {
        DeviceCommands::Walk { path } => {
            let files = fs
                .walk(&path)
                .with_context(|| format!("Failed to list {path} on the device"))?;
            print_paths(&files);
        }
        DeviceCommands::Rmtree { path } => {
            let removed = fs
                .rmtree(&path)
                .with_context(|| format!("Failed to remove {path} on the device"))?;
            if is_json() {
                print_paths(&removed);
            } else {
                print_success(&format!("Removed {} paths", removed.len()));
                for path in &removed {
                    print_detail(path);
                }
            }
        }
        DeviceCommands::Cat { path } => {
            let contents = fs
                .cat(&path)
                .with_context(|| format!("Failed to read {path} on the device"))?;
            print!("{contents}");
        }
        DeviceCommands::Mkdir { path } => {
            let created = fs.mkdir(&path);
            if is_json() {
                print_paths(&created);
            } else if created.is_empty() {
                print_success(&format!("{path} already exists"));
            } else {
                print_success(&format!("Created {path}"));
            }
        }
    }
    Ok(())
}
