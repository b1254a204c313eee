//! Declared buildable units
//!
//! A target is one entry of `[[resources]]`, `[[sources]]`,
//! `[[dependencies]]` or `[[tools]]` in `caiman.toml`, resolved into a flat
//! descriptor the builders work with.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::error::ConfigError;

/// The four target categories, in build order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKind {
    Resource,
    Source,
    Dependency,
    Tool,
}

impl TargetKind {
    /// All kinds in the order a full build processes them
    pub const ALL: [TargetKind; 4] = [
        TargetKind::Resource,
        TargetKind::Source,
        TargetKind::Dependency,
        TargetKind::Tool,
    ];

    /// Folder name used in config sections, manifest paths and build requests
    pub fn folder(self) -> &'static str {
        match self {
            Self::Resource => "resources",
            Self::Source => "sources",
            Self::Dependency => "dependencies",
            Self::Tool => "tools",
        }
    }

    /// Whether targets of this kind are fetched from a channel
    pub fn is_package(self) -> bool {
        matches!(self, Self::Dependency | Self::Tool)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

impl FromStr for TargetKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resources" | "resource" => Ok(Self::Resource),
            "sources" | "source" => Ok(Self::Source),
            "dependencies" | "dependency" => Ok(Self::Dependency),
            "tools" | "tool" => Ok(Self::Tool),
            other => Err(ConfigError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// A target entry as written in `caiman.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetSpec {
    /// Target name; for packages this is the channel package path
    pub name: String,

    /// Directory the target's files are taken from, relative to the workspace
    #[serde(default)]
    pub parent: PathBuf,

    /// Glob patterns selecting files; empty selects everything
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// Extra ignore patterns for this target
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignores: Vec<String>,

    /// Package version (dependencies and tools)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Channel name (dependencies and tools)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Stage into the frozen tree instead of the deploy tree
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub frozen: bool,

    /// Compile `.py` files to `.mpy`
    #[serde(default = "default_compile")]
    pub compile: bool,
}

fn default_compile() -> bool {
    true
}

impl TargetSpec {
    /// A spec with only a name and parent set
    pub fn new(name: impl Into<String>, parent: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            files: Vec::new(),
            ignores: Vec::new(),
            version: None,
            channel: None,
            frozen: false,
            compile: default_compile(),
        }
    }
}

/// File-extension remapping applied when projecting source paths to targets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixMap(BTreeMap<String, String>);

impl SuffixMap {
    /// The `.py` to `.mpy` mapping used for compiled targets
    pub fn compiled() -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            defaults::SOURCE_SUFFIX.to_string(),
            defaults::COMPILED_SUFFIX.to_string(),
        );
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Project a path through the map; unmapped extensions pass through
    pub fn apply(&self, path: &Path) -> PathBuf {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return path.to_path_buf();
        };
        match self.0.get(&format!(".{ext}")) {
            Some(mapped) => path.with_extension(mapped.trim_start_matches('.')),
            None => path.to_path_buf(),
        }
    }
}

/// A resolved target descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub kind: TargetKind,
    pub name: String,
    pub parent: PathBuf,
    pub files: Vec<String>,
    pub ignores: Vec<String>,
    /// Requested version; always set for packages
    pub version: String,
    pub channel: Option<String>,
    pub frozen: bool,
    pub compile: bool,
}

impl Target {
    /// Resolve a config entry of the given kind
    pub fn from_spec(kind: TargetKind, spec: &TargetSpec) -> Self {
        let version = match spec.version.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ if kind.is_package() => defaults::DEPENDENCY_VERSION.to_string(),
            _ => String::new(),
        };

        Self {
            kind,
            name: spec.name.clone(),
            parent: spec.parent.clone(),
            files: spec.files.clone(),
            ignores: spec.ignores.clone(),
            version,
            channel: spec.channel.clone(),
            frozen: spec.frozen && kind != TargetKind::Resource,
            compile: spec.compile && kind != TargetKind::Resource,
        }
    }

    /// Last `/`-separated segment of the name
    ///
    /// Channel packages can be nested (`github:org/repo/pkg`); manifests and
    /// staging areas are keyed on the final segment.
    pub fn package_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Extension remapping for this target
    pub fn suffix_map(&self) -> SuffixMap {
        if self.compile {
            SuffixMap::compiled()
        } else {
            SuffixMap::default()
        }
    }

    /// Build-tree container this target stages into
    pub fn container(&self) -> &'static str {
        if self.frozen {
            defaults::FROZEN_CONTAINER
        } else {
            defaults::DEPLOY_CONTAINER
        }
    }

    /// Name used in logs and build requests, e.g. `sources:micropython`
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_package() {
            write!(f, "{}@{}", self.name, self.version)
        } else {
            f.write_str(&self.name)
        }
    }
}
