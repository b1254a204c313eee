//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod clean;
pub mod deploy;
pub mod device;
pub mod doctor;
pub mod init;
pub mod install;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::core::config::Project;
use crate::core::target::TargetKind;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new caiman workspace
    Init {
        /// Application name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// Application author
        #[arg(short, long)]
        author: Option<String>,

        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Build resources, sources, dependencies and tools
    Build {
        /// What to build: `kind` or `kind:name` (everything when omitted)
        target: Option<String>,

        /// Reinstall dependencies and tools even when current
        #[arg(short, long)]
        force: bool,
    },

    /// Install a package into the workspace
    Install {
        /// Package to install: <package>@<version>
        package: String,

        /// Install as a dependency or a tool
        #[arg(short, long, default_value = "dependencies")]
        scope: TargetKind,

        /// Channel to install from (the first declared one by default)
        #[arg(long)]
        channel: Option<String>,

        /// Reinstall even when the version is already installed
        #[arg(short, long)]
        reinstall: bool,
    },

    /// Upload the build tree to the device
    Deploy,

    /// Run a Python module on the device, streaming its output
    Run {
        /// Module to import on the device
        module: String,
    },

    /// Remove build output and staging directories
    Clean,

    /// Check system dependencies and configuration
    Doctor,

    /// Device filesystem operations
    Device {
        #[command(subcommand)]
        command: DeviceCommands,
    },
}

/// Device filesystem subcommands
#[derive(Subcommand, Debug)]
pub enum DeviceCommands {
    /// List every file below a device directory
    Walk {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Remove a device directory recursively
    Rmtree { path: String },

    /// Print a device file
    Cat { path: String },

    /// Create a device directory and its parents
    Mkdir { path: String },
}

/// Load the workspace for commands that need one
pub(crate) fn load_project(config_path: &Path) -> Result<Project> {
    Project::load(config_path)
        .with_context(|| format!("Failed to load workspace from {}", config_path.display()))
}

impl Commands {
    /// Run the command, returning the process exit code
    pub async fn run(self, config_path: &Path) -> Result<i32> {
        match self {
            Self::Init {
                name,
                author,
                force,
            } => {
                let options = crate::core::init::InitOptions {
                    name,
                    author,
                    force,
                };
                init::execute(config_path, &options).await?;
                Ok(0)
            }
            Self::Build { target, force } => {
                build::execute(config_path, target.as_deref(), force).await?;
                Ok(0)
            }
            Self::Install {
                package,
                scope,
                channel,
                reinstall,
            } => {
                let options = install::InstallOptions {
                    package,
                    scope,
                    channel,
                    reinstall,
                };
                install::execute(config_path, &options).await?;
                Ok(0)
            }
            Self::Deploy => {
                deploy::execute(config_path).await?;
                Ok(0)
            }
            Self::Run { module } => run::execute(config_path, &module).await,
            Self::Clean => {
                clean::execute(config_path).await?;
                Ok(0)
            }
            Self::Doctor => {
                doctor::execute(config_path).await?;
                Ok(0)
            }
            Self::Device { command } => {
                device::execute(config_path, command).await?;
                Ok(0)
            }
        }
    }
}
