//! Source selection and projection
//!
//! [`WorkspaceSource`] binds a target to the workspace: it enumerates the
//! files the target selects under its parent directory, applying ignore
//! rules, and projects each one to its location in the build tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::core::ignore::IgnoreSpec;
use crate::core::manifest::Manifest;
use crate::core::target::{SuffixMap, Target};
use crate::core::task::Task;
use crate::core::workspace::Workspace;
use crate::error::{BuildError, ConfigError, FilesystemError};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled file-selection patterns
///
/// A pattern selects a file if it matches the file's relative path or any
/// trailing part of it, so `*.py` selects `a.py` and `lib/b.py` alike. An
/// empty selection selects every file.
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    patterns: Vec<Pattern>,
}

impl FileSelection {
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                let mut body = raw.trim_start_matches("./");
                // Trailing-part matching already covers any depth
                while let Some(rest) = body.strip_prefix("**/") {
                    body = rest;
                }
                Pattern::new(body).map_err(|e| ConfigError::InvalidPattern {
                    pattern: raw.to_string(),
                    error: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn selects(&self, relative: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (0..parts.len()).any(|start| {
            let candidate = parts[start..].join("/");
            self.patterns
                .iter()
                .any(|p| p.matches_with(&candidate, MATCH_OPTIONS))
        })
    }
}

/// A target's view of the workspace
#[derive(Debug)]
pub struct WorkspaceSource<'a> {
    workspace: &'a Workspace,
    target: &'a Target,
    source_root: PathBuf,
    target_root: PathBuf,
    selection: FileSelection,
    ignores: IgnoreSpec,
    suffix_map: SuffixMap,
}

impl<'a> WorkspaceSource<'a> {
    /// Bind a target to the workspace, projecting into the target's container
    pub fn new(workspace: &'a Workspace, target: &'a Target) -> Result<Self, ConfigError> {
        let target_root = workspace.asset_root(target.frozen);
        Self::with_target_root(workspace, target, target_root)
    }

    /// Bind a target to the workspace with an explicit output root
    pub fn with_target_root(
        workspace: &'a Workspace,
        target: &'a Target,
        target_root: PathBuf,
    ) -> Result<Self, ConfigError> {
        let source_root = workspace.path(&target.parent)?;
        let ignores = workspace
            .ignore_spec()
            .clone()
            .chain(&IgnoreSpec::from_lines(&target.ignores)?);

        Ok(Self {
            workspace,
            target,
            source_root,
            target_root,
            selection: FileSelection::new(&target.files)?,
            ignores,
            suffix_map: target.suffix_map(),
        })
    }

    pub fn target(&self) -> &Target {
        self.target
    }

    /// Directory files are selected from
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Directory files are projected into
    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        match path.strip_prefix(self.workspace.root()) {
            Ok(rel) => self.ignores.is_ignored(rel, is_dir),
            Err(_) => false,
        }
    }

    /// Selected files, relative to the source root, in sorted order
    ///
    /// A missing source root yields nothing. Each file appears once even if
    /// several patterns select it.
    pub fn files(&self) -> impl Iterator<Item = Result<PathBuf, FilesystemError>> + '_ {
        let exists = self.source_root.is_dir();
        let mut seen = HashSet::new();

        WalkDir::new(&self.source_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                !self.is_ignored(entry.path(), entry.file_type().is_dir())
            })
            .filter(move |_| exists)
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => {
                    let rel = entry
                        .path()
                        .strip_prefix(&self.source_root)
                        .map(Path::to_path_buf)
                        .ok()?;
                    (self.selection.selects(&rel) && seen.insert(rel.clone())).then_some(Ok(rel))
                }
                Err(e) => Some(Err(FilesystemError::Walk {
                    path: self.source_root.clone(),
                    error: e.to_string(),
                })),
            })
    }

    /// Target path for a source-relative path
    pub fn project(&self, relative: &Path) -> PathBuf {
        self.target_root.join(self.suffix_map.apply(relative))
    }

    /// Target-relative path for a source-relative path
    pub fn project_relative(&self, relative: &Path) -> PathBuf {
        self.suffix_map.apply(relative)
    }

    /// Copy or compile tasks for every selected file
    pub fn tasks(&self) -> impl Iterator<Item = Result<Task, FilesystemError>> + '_ {
        self.files().map(move |rel| {
            rel.map(|rel| Task::projected(self.source_root.join(&rel), self.project(&rel)))
        })
    }

    /// Manifest of the selected files as they are in the source tree
    pub fn create_source_manifest(&self) -> Result<Manifest, BuildError> {
        let files = self.files().collect::<Result<Vec<_>, _>>()?;
        Ok(Manifest::from_paths(
            &self.target.name,
            &self.target.version,
            &self.source_root,
            files,
        )?)
    }

    /// Manifest of the projected files as they are in the build tree
    pub fn create_target_manifest(&self) -> Result<Manifest, BuildError> {
        let files = self
            .files()
            .map(|rel| rel.map(|rel| self.project_relative(&rel)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Manifest::from_paths(
            &self.target.name,
            &self.target.version,
            &self.target_root,
            files,
        )?)
    }
}
