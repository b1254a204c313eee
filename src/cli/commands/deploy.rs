//! CLI implementation for `caiman deploy` command

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::cli::output::{create_spinner, print_detail, print_success};
use crate::core::deployment::deploy_firmware;
use crate::infra::device::DeviceBridge;
use crate::infra::remote_fs::RemoteFs;

use super::load_project;

/// Execute the deploy command
pub async fn execute(config_path: &Path) -> Result<()> {
    let project = load_project(config_path)?;
    let build_root = project.workspace.build_root();
    if !build_root.is_dir() {
        bail!(
            "Nothing to deploy: {} does not exist. Run 'caiman build' first.",
            project.workspace.display_path(build_root)
        );
    }

    let device = DeviceBridge::from_config(&project.config.device);
    let fs = RemoteFs::new(&device, project.workspace.artifact_root().join("remote"));

    let spinner = create_spinner("Uploading to device...");
    let result = deploy_firmware(build_root, &fs);
    spinner.finish_and_clear();
    let plan = result.with_context(|| "Deploy failed")?;

    print_success(&format!("Deployed {} entries", plan.len()));
    for step in &plan {
        print_detail(&format!("{} -> :/{}", step.source.display(), step.destination));
    }
    Ok(())
}
