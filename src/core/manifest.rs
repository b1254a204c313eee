//! Content manifests
//!
//! A manifest records the files an artifact consists of, each with its SHA-1
//! digest and size. Manifests are persisted as JSON under the workspace
//! manifest root, one file per `(kind, package, asset type)`:
//!
//! ```text
//! build/manifests/dependencies/logging-source.json
//! {
//!   "logging": {
//!     "version": "0.6",
//!     "items": [{ "path": "lib/logging.mpy", "sha1": "...", "size": 1234 }]
//!   }
//! }
//! ```
//!
//! The record is keyed by artifact name so several artifacts can share one
//! physical file.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::core::target::TargetKind;
use crate::core::workspace::Workspace;
use crate::error::ManifestError;

/// Compute the SHA-1 digest and size of a file
pub fn sha1_file(path: &Path) -> std::io::Result<(String, u64)> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 8192];
    let mut size = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok((hex::encode(hasher.finalize()), size))
}

/// Render a relative path with `/` separators
pub fn manifest_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// One file of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManifestItem {
    /// Path relative to the artifact root, `/`-separated
    pub path: String,
    /// Lowercase hex SHA-1 of the content
    pub sha1: String,
    /// Size in bytes
    pub size: u64,
}

impl ManifestItem {
    /// Hash `root/relative` into an item
    pub fn create(relative: &Path, root: &Path) -> Result<Self, ManifestError> {
        let full = root.join(relative);
        let (sha1, size) = sha1_file(&full).map_err(|e| ManifestError::Hash {
            path: full.clone(),
            error: e.to_string(),
        })?;
        Ok(Self {
            path: manifest_path(relative),
            sha1,
            size,
        })
    }

    /// Path relative to the artifact root
    pub fn relative_path(&self) -> PathBuf {
        self.path.split('/').collect()
    }

    /// Whether the file at `path` differs from this record
    ///
    /// A missing or unreadable file counts as changed. Size is compared
    /// first so most mismatches skip hashing.
    pub fn is_changed(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() && meta.len() == self.size => {}
            _ => return true,
        }
        match sha1_file(path) {
            Ok((sha1, _)) => sha1 != self.sha1,
            Err(_) => true,
        }
    }
}

/// Which side of a build a manifest describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    /// The files an artifact was built from (or installed as)
    Source,
    /// The files an artifact produced in the build tree
    Target,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The files of one artifact at one version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub items: Vec<ManifestItem>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestRecord {
    #[serde(default)]
    version: String,
    #[serde(default)]
    items: Vec<ManifestItem>,
}

impl Manifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            items: Vec::new(),
        }
    }

    /// Hash every relative path under `root`
    pub fn from_paths<I, P>(
        name: impl Into<String>,
        version: impl Into<String>,
        root: &Path,
        paths: I,
    ) -> Result<Self, ManifestError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let items = paths
            .into_iter()
            .map(|p| ManifestItem::create(p.as_ref(), root))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.into(),
            version: version.into(),
            items,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item paths relative to the artifact root
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.items.iter().map(ManifestItem::relative_path)
    }

    /// Look up an item by its `/`-separated path
    pub fn get(&self, path: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.path == path)
    }

    /// Whether `relative` under `root` differs from its recorded item
    ///
    /// A path the manifest does not record counts as changed.
    pub fn is_path_changed(&self, root: &Path, relative: &Path) -> bool {
        match self.get(&manifest_path(relative)) {
            Some(item) => item.is_changed(&root.join(relative)),
            None => true,
        }
    }

    /// Items whose file under `root` no longer matches
    pub fn changed_items(&self, root: &Path) -> Vec<&ManifestItem> {
        self.items
            .iter()
            .filter(|item| item.is_changed(&root.join(item.relative_path())))
            .collect()
    }

    /// Same version and same set of items, ignoring order
    pub fn same_content(&self, other: &Manifest) -> bool {
        if self.version != other.version || self.items.len() != other.items.len() {
            return false;
        }
        let mut ours = self.items.clone();
        let mut theirs = other.items.clone();
        ours.sort();
        theirs.sort();
        ours == theirs
    }
}

/// Manifest persistence under the workspace manifest root
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn for_workspace(workspace: &Workspace) -> Self {
        Self::new(workspace.manifest_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the manifest for `(kind, package, asset)`
    pub fn path(&self, kind: TargetKind, asset: AssetType, package: &str) -> PathBuf {
        self.root
            .join(kind.folder())
            .join(format!("{package}-{asset}.json"))
    }

    /// Load a manifest; `None` when the file or the keyed record is absent
    pub fn load(
        &self,
        kind: TargetKind,
        asset: AssetType,
        package: &str,
        name: &str,
    ) -> Result<Option<Manifest>, ManifestError> {
        let path = self.path(kind, asset, package);
        let Some(mut document) = read_document(&path)? else {
            return Ok(None);
        };
        let Some(value) = document.remove(name) else {
            return Ok(None);
        };
        let record: ManifestRecord =
            serde_json::from_value(value).map_err(|e| ManifestError::Parse {
                path: path.clone(),
                error: e.to_string(),
            })?;
        Ok(Some(Manifest {
            name: name.to_string(),
            version: record.version,
            items: record.items,
        }))
    }

    /// Persist a manifest, replacing any record with the same name
    pub fn save(
        &self,
        kind: TargetKind,
        asset: AssetType,
        package: &str,
        manifest: &Manifest,
    ) -> Result<PathBuf, ManifestError> {
        let path = self.path(kind, asset, package);
        let write_error = |e: &dyn fmt::Display| ManifestError::Write {
            path: path.clone(),
            error: e.to_string(),
        };

        let mut document = match read_document(&path) {
            Ok(document) => document.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Replacing unreadable manifest: {e}");
                serde_json::Map::new()
            }
        };
        let record = ManifestRecord {
            version: manifest.version.clone(),
            items: manifest.items.clone(),
        };
        document.insert(
            manifest.name.clone(),
            serde_json::to_value(record).map_err(|e| write_error(&e))?,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_error(&e))?;
        }
        let content = serde_json::to_string_pretty(&document).map_err(|e| write_error(&e))?;
        std::fs::write(&path, content).map_err(|e| write_error(&e))?;

        tracing::debug!("Saved manifest {}", path.display());
        Ok(path)
    }
}

fn read_document(
    path: &Path,
) -> Result<Option<serde_json::Map<String, serde_json::Value>>, ManifestError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ManifestError::Read {
                path: path.to_path_buf(),
                error: e.to_string(),
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ManifestError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
}
