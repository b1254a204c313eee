//! Workspace configuration (caiman.toml)
//!
//! Parsing, environment variable substitution (`${VAR}`) and validation of
//! the project config, plus [`Project`], the loaded config bound to its
//! workspace layout.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::core::target::{Target, TargetKind, TargetSpec};
use crate::core::workspace::Workspace;
use crate::error::ConfigError;

/// The workspace config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Config schema version
    #[serde(default = "default_config_version")]
    pub version: String,

    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Package channels, first one is the default
    #[serde(default = "default_channels")]
    pub channels: Vec<Channel>,

    #[serde(default = "default_sources")]
    pub sources: Vec<TargetSpec>,

    #[serde(default)]
    pub resources: Vec<TargetSpec>,

    #[serde(default)]
    pub dependencies: Vec<TargetSpec>,

    #[serde(default)]
    pub tools: Vec<TargetSpec>,
}

fn default_config_version() -> String {
    defaults::APPLICATION_VERSION.to_string()
}

fn default_channels() -> Vec<Channel> {
    vec![Channel::default()]
}

fn default_sources() -> Vec<TargetSpec> {
    vec![TargetSpec::new(defaults::SOURCE_NAME, defaults::SOURCE_DIR)]
}

/// Application metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_application_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

fn default_application_version() -> String {
    defaults::APPLICATION_VERSION.to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: default_application_version(),
            author: None,
        }
    }
}

/// Device connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Serial port; auto-detected by the remote program when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    /// Remote-control program prefix
    #[serde(default = "default_remote")]
    pub remote: Vec<String>,
}

fn default_remote() -> Vec<String> {
    vec![defaults::REMOTE_PROGRAM.to_string()]
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            remote: default_remote(),
        }
    }
}

/// Toolchain settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// Cross-compiler program prefix
    #[serde(default = "default_compiler")]
    pub compiler: Vec<String>,
}

fn default_compiler() -> Vec<String> {
    vec![defaults::COMPILER_PROGRAM.to_string()]
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
        }
    }
}

/// Workspace directory layout, all relative to the workspace root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceConfig {
    #[serde(default = "default_build")]
    pub build: PathBuf,

    #[serde(default = "default_packages")]
    pub packages: PathBuf,

    #[serde(default = "default_tools")]
    pub tools: PathBuf,

    #[serde(default = "default_manifests")]
    pub manifests: PathBuf,

    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,

    #[serde(default = "default_extra_ignores")]
    pub extra_ignores: Vec<String>,

    #[serde(default = "default_use_gitignore")]
    pub use_gitignore: bool,
}

fn default_build() -> PathBuf {
    PathBuf::from(defaults::BUILD_DIR)
}

fn default_packages() -> PathBuf {
    PathBuf::from(defaults::PACKAGES_DIR)
}

fn default_tools() -> PathBuf {
    PathBuf::from(defaults::TOOLS_DIR)
}

fn default_manifests() -> PathBuf {
    PathBuf::from(defaults::MANIFESTS_DIR)
}

fn default_artifacts() -> PathBuf {
    PathBuf::from(defaults::ARTIFACTS_DIR)
}

fn default_extra_ignores() -> Vec<String> {
    defaults::IGNORES.iter().map(ToString::to_string).collect()
}

fn default_use_gitignore() -> bool {
    true
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            build: default_build(),
            packages: default_packages(),
            tools: default_tools(),
            manifests: default_manifests(),
            artifacts: default_artifacts(),
            extra_ignores: default_extra_ignores(),
            use_gitignore: default_use_gitignore(),
        }
    }
}

/// A package channel: a named package index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub index: String,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            name: defaults::CHANNEL_NAME.to_string(),
            index: defaults::CHANNEL_INDEX.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            application: ApplicationConfig::default(),
            device: DeviceConfig::default(),
            toolchain: ToolchainConfig::default(),
            workspace: WorkspaceConfig::default(),
            channels: default_channels(),
            sources: default_sources(),
            resources: Vec::new(),
            dependencies: Vec::new(),
            tools: Vec::new(),
        }
    }
}

/// Replace `${VAR}` with the environment variable's value (empty if unset)
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| ConfigError::Parse(format!("Invalid regex: {e}")))?;

    Ok(re
        .replace_all(input, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned())
}

fn substitute_in_value(value: &mut toml::Value) -> Result<(), ConfigError> {
    match value {
        toml::Value::String(s) => *s = substitute_env_vars(s)?,
        toml::Value::Array(items) => {
            for item in items.iter_mut() {
                substitute_in_value(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                substitute_in_value(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

impl Config {
    /// Parse from TOML without substitution
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Parse from TOML, substituting `${VAR}` in every string value
    pub fn from_toml_with_env(content: &str) -> Result<Self, ConfigError> {
        let mut value: toml::Value =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        substitute_in_value(&mut value)?;
        value
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml_with_env(&content)
    }

    /// Write to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self
            .to_toml()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Look up a channel by name
    pub fn find_channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// The named channel, or the first declared one when `name` is `None`
    pub fn resolve_channel(&self, name: Option<&str>) -> Result<&Channel, ConfigError> {
        match name {
            Some(name) => self
                .find_channel(name)
                .ok_or_else(|| ConfigError::UnknownChannel {
                    name: name.to_string(),
                }),
            None => self.channels.first().ok_or(ConfigError::NoChannels),
        }
    }

    /// Raw entries of one kind
    pub fn specs(&self, kind: TargetKind) -> &[TargetSpec] {
        match kind {
            TargetKind::Resource => &self.resources,
            TargetKind::Source => &self.sources,
            TargetKind::Dependency => &self.dependencies,
            TargetKind::Tool => &self.tools,
        }
    }

    /// Resolved targets of one kind, in declaration order
    pub fn targets(&self, kind: TargetKind) -> Vec<Target> {
        self.specs(kind)
            .iter()
            .map(|spec| Target::from_spec(kind, spec))
            .collect()
    }

    /// Check names, parents and channel references of every target
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in TargetKind::ALL {
            let mut seen = HashSet::new();
            for spec in self.specs(kind) {
                if spec.name.trim().is_empty() {
                    return Err(ConfigError::EmptyName {
                        kind: kind.to_string(),
                    });
                }
                if !seen.insert(spec.name.as_str()) {
                    return Err(ConfigError::DuplicateTarget {
                        kind: kind.to_string(),
                        name: spec.name.clone(),
                    });
                }
                if spec.parent.is_absolute() || spec.parent.has_root() {
                    return Err(ConfigError::AbsolutePath {
                        path: spec.parent.clone(),
                    });
                }
                if let Some(pattern) = spec.files.iter().find(|p| p.starts_with('/')) {
                    return Err(ConfigError::AbsolutePath {
                        path: PathBuf::from(pattern),
                    });
                }
                if kind.is_package() {
                    self.resolve_channel(spec.channel.as_deref())?;
                }
            }
        }
        Ok(())
    }
}

/// A loaded config bound to its workspace
#[derive(Debug)]
pub struct Project {
    pub config: Config,
    pub workspace: Workspace,
    config_path: PathBuf,
}

impl Project {
    /// Load and validate `caiman.toml`; the workspace root is its directory
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let config = Config::load(config_path)?;
        let root = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::new(config, root, config_path.to_path_buf())
    }

    /// Bind an in-memory config to a workspace root
    pub fn new(
        config: Config,
        root: impl Into<PathBuf>,
        config_path: PathBuf,
    ) -> Result<Self, ConfigError> {
        let workspace = Workspace::new(root, &config.workspace)?;
        config.validate()?;
        for kind in TargetKind::ALL {
            for spec in config.specs(kind) {
                workspace.path(&spec.parent)?;
            }
        }
        Ok(Self {
            config,
            workspace,
            config_path,
        })
    }

    /// Path the config was loaded from
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolved targets of one kind
    pub fn targets(&self, kind: TargetKind) -> Vec<Target> {
        self.config.targets(kind)
    }
}
