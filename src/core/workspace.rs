//! Workspace layout
//!
//! Resolves the configured build, package, tool, manifest and artifact
//! directories against the workspace root and guarantees none of them escape
//! it.

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use crate::config::defaults;
use crate::core::config::WorkspaceConfig;
use crate::core::ignore::IgnoreSpec;
use crate::error::ConfigError;

/// Lexically normalize a path: drop `.` and fold `..` into its parent
///
/// Does not touch the filesystem, so it works for paths that do not exist
/// yet. A `..` that cannot be folded is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// A workspace root with its resolved directory layout
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    build: PathBuf,
    packages: PathBuf,
    tools: PathBuf,
    manifests: PathBuf,
    artifacts: PathBuf,
    extra_ignores: IgnoreSpec,
    use_gitignore: bool,
    ignores: OnceLock<IgnoreSpec>,
}

impl Workspace {
    /// Resolve a workspace layout
    ///
    /// Fails if any configured directory is absolute or escapes the root, or
    /// if an extra ignore pattern does not compile.
    pub fn new(root: impl Into<PathBuf>, config: &WorkspaceConfig) -> Result<Self, ConfigError> {
        let root = normalize(&absolute(root.into()));
        let resolve = |relative: &Path| resolve_within(&root, relative);

        Ok(Self {
            build: resolve(&config.build)?,
            packages: resolve(&config.packages)?,
            tools: resolve(&config.tools)?,
            manifests: resolve(&config.manifests)?,
            artifacts: resolve(&config.artifacts)?,
            extra_ignores: IgnoreSpec::from_lines(&config.extra_ignores)?,
            use_gitignore: config.use_gitignore,
            ignores: OnceLock::new(),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path inside the workspace
    pub fn path(&self, relative: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
        resolve_within(&self.root, relative.as_ref())
    }

    /// Root of the build tree
    pub fn build_root(&self) -> &Path {
        &self.build
    }

    /// Build-tree container: `frozen` or the deployable `micropython` tree
    pub fn asset_root(&self, frozen: bool) -> PathBuf {
        let container = if frozen {
            defaults::FROZEN_CONTAINER
        } else {
            defaults::DEPLOY_CONTAINER
        };
        self.build.join(container)
    }

    /// Live install area for dependencies
    pub fn package_root(&self) -> &Path {
        &self.packages
    }

    /// Live install area for tools
    pub fn tool_root(&self) -> &Path {
        &self.tools
    }

    /// Root of the manifest store
    pub fn manifest_root(&self) -> &Path {
        &self.manifests
    }

    /// Scratch area for staging and helper files
    pub fn artifact_root(&self) -> &Path {
        &self.artifacts
    }

    /// Strip the workspace root from a path
    pub fn relative_path(&self, path: &Path) -> Result<PathBuf, ConfigError> {
        normalize(path)
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| ConfigError::OutsideWorkspace {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })
    }

    /// Workspace-relative rendering for messages, falling back to the full path
    pub fn display_path(&self, path: &Path) -> String {
        match self.relative_path(path) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }

    /// Workspace-wide ignore rules: root `.gitignore` then `extra_ignores`
    ///
    /// The `.gitignore` is read once per workspace.
    pub fn ignore_spec(&self) -> &IgnoreSpec {
        self.ignores.get_or_init(|| {
            let gitignore = if self.use_gitignore {
                load_gitignore(&self.root.join(".gitignore"))
            } else {
                IgnoreSpec::default()
            };
            gitignore.chain(&self.extra_ignores)
        })
    }
}

fn load_gitignore(path: &Path) -> IgnoreSpec {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            tracing::debug!("Loaded ignore rules from {}", path.display());
            IgnoreSpec::from_gitignore(&content)
        }
        Err(_) => IgnoreSpec::default(),
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

fn resolve_within(root: &Path, relative: &Path) -> Result<PathBuf, ConfigError> {
    if relative.has_root() || relative.is_absolute() {
        return Err(ConfigError::AbsolutePath {
            path: relative.to_path_buf(),
        });
    }
    let resolved = normalize(&root.join(relative));
    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(ConfigError::OutsideWorkspace {
            path: relative.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}
