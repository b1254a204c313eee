//! Environment checks
//!
//! Looks up the configured cross compiler and remote-control program on
//! `PATH`, asks each for its version, and collects problems with the
//! workspace config.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::core::config::{Config, Project};
use crate::error::ConfigError;

/// Outcome of looking up one external program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramCheck {
    /// What the program is used for, e.g. "Cross compiler"
    pub label: String,
    /// Executable that was looked up (first word of the configured prefix)
    pub program: String,
    /// Resolved location, `None` when not on `PATH`
    pub location: Option<PathBuf>,
    pub version: Option<String>,
    /// How to install or configure the program
    pub hint: String,
}

impl ProgramCheck {
    pub fn is_ok(&self) -> bool {
        self.location.is_some()
    }

    /// Failure description, `None` when the program was found
    pub fn problem(&self) -> Option<String> {
        if self.is_ok() {
            None
        } else if self.program.is_empty() {
            Some("no program configured".to_string())
        } else {
            Some(format!("'{}' not found in PATH", self.program))
        }
    }
}

/// Everything `caiman doctor` found
#[derive(Debug, Default)]
pub struct DoctorReport {
    pub programs: Vec<ProgramCheck>,
    pub config_issues: Vec<String>,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.missing().is_empty() && self.config_issues.is_empty()
    }

    pub fn passed_count(&self) -> usize {
        self.programs.iter().filter(|c| c.is_ok()).count()
    }

    /// Programs that could not be found
    pub fn missing(&self) -> Vec<&ProgramCheck> {
        self.programs.iter().filter(|c| !c.is_ok()).collect()
    }
}

/// First dotted version number in a program's `--version` output
pub fn extract_version(output: &str) -> Option<String> {
    let re = Regex::new(r"v?(\d+\.\d+(?:\.\d+)?(?:-\w+)?)").ok()?;
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn query_version(location: &Path, extra_args: &[String]) -> Option<String> {
    let output = std::process::Command::new(location)
        .args(extra_args)
        .arg("--version")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    extract_version(&text)
}

/// Look up a program prefix such as `["python", "-m", "mpy_cross"]`
///
/// Only the first word has to be on `PATH`; the rest is passed along when
/// asking for the version.
pub fn check_program(label: &str, prefix: &[String], hint: &str) -> ProgramCheck {
    let program = prefix.first().cloned().unwrap_or_default();
    let location = (!program.is_empty())
        .then(|| which::which(&program).ok())
        .flatten();
    let version = location
        .as_deref()
        .and_then(|path| query_version(path, prefix.get(1..).unwrap_or_default()));

    ProgramCheck {
        label: label.to_string(),
        program,
        location,
        version,
        hint: hint.to_string(),
    }
}

/// Problems loading or validating the workspace config
///
/// A missing config is not a problem: doctor also runs outside workspaces.
pub fn check_project_config(config_path: &Path) -> Vec<String> {
    match Project::load(config_path) {
        Ok(project) if project.config.application.name.trim().is_empty() => {
            vec!["[application] name is empty".to_string()]
        }
        Ok(_) | Err(ConfigError::NotFound { .. }) => Vec::new(),
        Err(e) => vec![e.to_string()],
    }
}

/// Run every check; without a loadable config the default programs are used
pub fn run_doctor(config_path: &Path) -> DoctorReport {
    let config = Config::load(config_path).unwrap_or_default();
    tracing::debug!(
        "Checking compiler {:?} and remote {:?}",
        config.toolchain.compiler,
        config.device.remote
    );

    DoctorReport {
        programs: vec![
            check_program(
                "Cross compiler",
                &config.toolchain.compiler,
                "pip install mpy-cross, or set [toolchain] compiler",
            ),
            check_program(
                "Remote control",
                &config.device.remote,
                "pip install mpremote, or set [device] remote",
            ),
        ],
        config_issues: check_project_config(config_path),
    }
}
