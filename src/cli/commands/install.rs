//! CLI implementation for `caiman install` command
//!
//! Installs a `<package>@<version>` that is not necessarily declared in the
//! config, using the same staging and skip rules as a build.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::cli::output::{create_spinner, print_detail, print_success};
use crate::core::installer::Installer;
use crate::core::target::{Target, TargetKind, TargetSpec};
use crate::infra::device::DeviceBridge;

use super::load_project;

/// Install options
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// `<package>@<version>`
    pub package: String,
    pub scope: TargetKind,
    pub channel: Option<String>,
    pub reinstall: bool,
}

/// Split `<package>@<version>`; the version is mandatory
pub fn parse_package_spec(spec: &str) -> Result<(String, String)> {
    match spec.rsplit_once('@') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => {
            Ok((name.to_string(), version.to_string()))
        }
        _ => bail!("Package version is required. Use the format <package>@<version>"),
    }
}

/// Execute the install command
pub async fn execute(config_path: &Path, options: &InstallOptions) -> Result<()> {
    if !options.scope.is_package() {
        bail!(
            "Invalid scope '{}': expected dependencies or tools",
            options.scope
        );
    }
    let (name, version) = parse_package_spec(&options.package)?;
    let project = load_project(config_path)?;

    let mut spec = TargetSpec::new(name, "");
    spec.version = Some(version);
    spec.channel.clone_from(&options.channel);
    let target = Target::from_spec(options.scope, &spec);

    let device = DeviceBridge::from_config(&project.config.device);
    let installer = Installer::new(&project, &device, options.scope);

    let spinner = create_spinner(&format!("Installing {target}..."));
    let result = installer.install(&target, options.reinstall);
    spinner.finish_and_clear();
    let outcome = result.with_context(|| format!("Failed to install {target}"))?;

    let location = project.workspace.display_path(installer.install_root());
    if outcome.installed {
        print_success(&format!("Installed {target} at {location}"));
        for path in outcome.manifest.paths() {
            print_detail(&path.display().to_string());
        }
    } else {
        print_success(&format!("{target} is already installed at {location}"));
    }
    Ok(())
}
