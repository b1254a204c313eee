//! Deployment of manifested files
//!
//! Two kinds of deployment live here. [`Deployment`] stages the files listed
//! in a manifest (an installed package, typically) into the build tree,
//! compiling where the suffix map says so. [`firmware_plan`] maps the
//! finished build tree onto the device filesystem for upload.

use std::path::{Path, PathBuf};

use crate::core::manifest::{manifest_path, Manifest, ManifestItem};
use crate::core::target::SuffixMap;
use crate::core::task::Task;
use crate::core::workspace::Workspace;
use crate::error::{BuildError, DeployError, FilesystemError};
use crate::infra::remote_fs::RemoteFs;
use crate::infra::toolchain::CrossCompiler;

/// Files of a manifest staged from one root into another
#[derive(Debug, Clone)]
pub struct Deployment<'a> {
    source_root: PathBuf,
    manifest: &'a Manifest,
    target_root: PathBuf,
    suffix_map: SuffixMap,
}

impl<'a> Deployment<'a> {
    pub fn new(
        source_root: impl Into<PathBuf>,
        manifest: &'a Manifest,
        target_root: impl Into<PathBuf>,
        suffix_map: SuffixMap,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            manifest,
            target_root: target_root.into(),
            suffix_map,
        }
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// One copy or compile task per manifest item
    pub fn tasks(&self) -> impl Iterator<Item = Task> + '_ {
        self.manifest.paths().map(move |rel| {
            let target = self.target_root.join(self.suffix_map.apply(&rel));
            Task::projected(self.source_root.join(rel), target)
        })
    }

    /// Target paths relative to the target root
    pub fn targets(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.manifest.paths().map(move |rel| self.suffix_map.apply(&rel))
    }

    /// Run every task and return the manifest of what landed
    pub fn execute(
        &self,
        compiler: &CrossCompiler,
        workspace: &Workspace,
    ) -> Result<Manifest, BuildError> {
        let mut items = Vec::with_capacity(self.manifest.len());
        for task in self.tasks() {
            tracing::info!("{}", task.describe(workspace));
            let produced = task.execute(compiler)?;
            let rel = produced
                .strip_prefix(&self.target_root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| produced.to_path_buf());
            items.push(ManifestItem::create(&rel, &self.target_root)?);
        }
        Ok(Manifest {
            name: self.manifest.name.clone(),
            version: self.manifest.version.clone(),
            items,
        })
    }
}

/// One upload of the firmware plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStep {
    /// Entry relative to the build root
    pub source: PathBuf,
    /// Device destination, empty for the device root
    pub destination: String,
    pub is_dir: bool,
}

/// Device destination for a build-root entry
///
/// Files keep their relative path; directories are copied recursively into
/// their parent, so a top-level directory lands in the device root.
pub fn firmware_destination(relative: &Path, is_dir: bool) -> String {
    let destination = if is_dir {
        relative.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        relative.to_path_buf()
    };
    let rendered = manifest_path(&destination);
    let rendered = rendered.trim_start_matches('/');
    if rendered == "." {
        String::new()
    } else {
        rendered.to_string()
    }
}

/// Upload steps for every top-level entry of the build root, sorted by name
pub fn firmware_plan(build_root: &Path) -> Result<Vec<UploadStep>, FilesystemError> {
    let walk_error = |e: std::io::Error| FilesystemError::Walk {
        path: build_root.to_path_buf(),
        error: e.to_string(),
    };
    if !build_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries = std::fs::read_dir(build_root)
        .map_err(walk_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(walk_error)?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    Ok(entries
        .into_iter()
        .map(|entry| {
            let source = PathBuf::from(entry.file_name());
            let is_dir = entry.path().is_dir();
            UploadStep {
                destination: firmware_destination(&source, is_dir),
                source,
                is_dir,
            }
        })
        .collect())
}

/// Upload the build tree to the device
pub fn deploy_firmware(
    build_root: &Path,
    fs: &RemoteFs<'_>,
) -> Result<Vec<UploadStep>, DeployError> {
    let plan = firmware_plan(build_root)?;
    for step in &plan {
        tracing::info!(
            "Uploading {} to :{}",
            step.source.display(),
            step.destination
        );
        fs.upload(&step.source, &step.destination, build_root)?;
    }
    Ok(plan)
}
