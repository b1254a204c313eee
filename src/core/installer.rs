//! Package installation
//!
//! Dependencies and tools are fetched from a channel by the device's own
//! package manager, running with a host staging directory mounted. Only after
//! every install command succeeded and the staged files are manifested are
//! they moved into the live package (or tool) area.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::config::Project;
use crate::core::manifest::{AssetType, Manifest, ManifestStore};
use crate::core::target::{Target, TargetKind};
use crate::core::task::{InstallTask, Task};
use crate::error::{FilesystemError, InstallError};
use crate::infra::device::DeviceBridge;
use crate::infra::filesystem;

/// Result of an install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Manifest of the installed files
    pub manifest: Manifest,
    /// False when the requested version was already installed
    pub installed: bool,
}

/// `name[/file]@version` specs grouped by install sub-directory
///
/// Without a file list the whole package installs into the staging root.
/// With one, each file installs into the directory it lives in, and files
/// sharing a directory share one install command. Groups keep first-seen
/// order.
pub fn install_groups(target: &Target) -> Vec<(PathBuf, Vec<String>)> {
    let mut groups: Vec<(PathBuf, Vec<String>)> = Vec::new();
    let specs: Vec<(PathBuf, String)> = if target.files.is_empty() {
        vec![(PathBuf::new(), format!("{}@{}", target.name, target.version))]
    } else {
        target
            .files
            .iter()
            .map(|file| {
                let file = file.trim_start_matches('/');
                let subdir = Path::new(file)
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                (subdir, format!("{}/{file}@{}", target.name, target.version))
            })
            .collect()
    };

    for (subdir, spec) in specs {
        match groups.iter_mut().find(|(dir, _)| *dir == subdir) {
            Some((_, names)) => names.push(spec),
            None => groups.push((subdir, vec![spec])),
        }
    }
    groups
}

/// Installs dependencies or tools of one project
#[derive(Debug)]
pub struct Installer<'a> {
    project: &'a Project,
    device: &'a DeviceBridge,
    kind: TargetKind,
    store: ManifestStore,
}

impl<'a> Installer<'a> {
    /// `kind` selects the live area: packages for dependencies, tools otherwise
    pub fn new(project: &'a Project, device: &'a DeviceBridge, kind: TargetKind) -> Self {
        Self {
            project,
            device,
            kind,
            store: ManifestStore::for_workspace(&project.workspace),
        }
    }

    /// Staging directory for one package
    pub fn artifact_root(&self, target: &Target) -> PathBuf {
        self.project
            .workspace
            .artifact_root()
            .join(self.kind.folder())
            .join(target.package_name())
    }

    /// Live install area
    pub fn install_root(&self) -> &Path {
        match self.kind {
            TargetKind::Tool => self.project.workspace.tool_root(),
            _ => self.project.workspace.package_root(),
        }
    }

    /// Manifest of the currently installed version, if any
    pub fn installed(&self, target: &Target) -> Result<Option<Manifest>, InstallError> {
        Ok(self.store.load(
            self.kind,
            AssetType::Source,
            target.package_name(),
            target.package_name(),
        )?)
    }

    /// Remote install commands for a target
    pub fn tasks(&self, target: &Target) -> Result<Vec<InstallTask>, InstallError> {
        let channel = self.project.config.resolve_channel(target.channel.as_deref())?;
        let mount = self.artifact_root(target);
        Ok(install_groups(target)
            .into_iter()
            .map(|(subdir, packages)| InstallTask {
                packages,
                index: channel.index.clone(),
                mount: mount.clone(),
                subdir,
            })
            .collect())
    }

    /// Install a target unless the same version is already installed
    pub fn install(&self, target: &Target, force: bool) -> Result<InstallOutcome, InstallError> {
        if !force {
            if let Some(manifest) = self.installed(target)? {
                if manifest.version == target.version {
                    tracing::info!("{target} is already installed");
                    let changed = manifest.changed_items(self.install_root());
                    if !changed.is_empty() {
                        tracing::warn!(
                            "{} installed file(s) of {target} were modified, use --force to reinstall",
                            changed.len()
                        );
                    }
                    return Ok(InstallOutcome {
                        manifest,
                        installed: false,
                    });
                }
            }
        }

        let tasks = self.tasks(target)?;
        let staging = self.artifact_root(target);
        if filesystem::remove_dir_all(&staging)? {
            tracing::debug!("Cleared leftover staging area {}", staging.display());
        }

        for task in &tasks {
            tracing::info!("{}", task.describe());
            task.execute(self.device)?;
        }

        let manifest = staged_manifest(target, &staging)?;
        self.store
            .save(self.kind, AssetType::Source, target.package_name(), &manifest)?;

        for path in manifest.paths() {
            let task = Task::move_file(staging.join(&path), self.install_root().join(&path));
            tracing::info!("{}", task.describe(&self.project.workspace));
            filesystem::move_file(&task.source, &task.target)?;
        }
        filesystem::remove_dir_all(&staging)?;

        Ok(InstallOutcome {
            manifest,
            installed: true,
        })
    }
}

fn staged_manifest(target: &Target, staging: &Path) -> Result<Manifest, InstallError> {
    let mut files = Vec::new();
    if staging.is_dir() {
        for entry in WalkDir::new(staging).sort_by_file_name() {
            let entry = entry.map_err(|e| FilesystemError::Walk {
                path: staging.to_path_buf(),
                error: e.to_string(),
            })?;
            if entry.file_type().is_file() {
                if let Ok(rel) = entry.path().strip_prefix(staging) {
                    files.push(rel.to_path_buf());
                }
            }
        }
    }
    Ok(Manifest::from_paths(
        target.package_name(),
        &target.version,
        staging,
        files,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::target::TargetSpec;
    use tempfile::TempDir;

    fn dependency(name: &str, files: &[&str]) -> Target {
        let mut spec = TargetSpec::new(name, "");
        spec.version = Some("1.0".to_string());
        spec.files = files.iter().map(ToString::to_string).collect();
        Target::from_spec(TargetKind::Dependency, &spec)
    }

    fn project(temp: &TempDir) -> Project {
        Project::new(Config::default(), temp.path(), temp.path().join("caiman.toml")).unwrap()
    }

    #[test]
    fn test_whole_package_is_one_group() {
        let groups = install_groups(&dependency("logging", &[]));
        assert_eq!(groups, vec![(PathBuf::new(), vec!["logging@1.0".to_string()])]);
    }

    #[test]
    fn test_files_group_by_directory_in_first_seen_order() {
        let target = dependency("github:org/pkg", &["lib/a.py", "b.py", "lib/c.py"]);
        let groups = install_groups(&target);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, PathBuf::from("lib"));
        assert_eq!(
            groups[0].1,
            vec!["github:org/pkg/lib/a.py@1.0", "github:org/pkg/lib/c.py@1.0"]
        );
        assert_eq!(groups[1].0, PathBuf::new());
        assert_eq!(groups[1].1, vec!["github:org/pkg/b.py@1.0"]);
    }

    #[test]
    fn test_roots_depend_on_kind() {
        let temp = TempDir::new().unwrap();
        let project = project(&temp);
        let device = DeviceBridge::default();
        let target = dependency("github:org/aiorepl", &[]);

        let deps = Installer::new(&project, &device, TargetKind::Dependency);
        let tools = Installer::new(&project, &device, TargetKind::Tool);

        assert_eq!(deps.install_root(), project.workspace.package_root());
        assert_eq!(tools.install_root(), project.workspace.tool_root());
        assert_eq!(
            deps.artifact_root(&target),
            project
                .workspace
                .artifact_root()
                .join("dependencies/aiorepl")
        );
    }

    #[test]
    fn test_unknown_channel_fails_before_any_work() {
        let temp = TempDir::new().unwrap();
        let project = project(&temp);
        let device = DeviceBridge::new(vec!["caiman-no-such-remote".to_string()], None);
        let mut target = dependency("logging", &[]);
        target.channel = Some("nowhere".to_string());

        let result = Installer::new(&project, &device, TargetKind::Dependency).install(&target, false);

        assert!(matches!(result, Err(InstallError::Config(_))));
    }

    #[test]
    fn test_matching_version_skips_install() {
        let temp = TempDir::new().unwrap();
        let project = project(&temp);
        // Any device call would fail to spawn
        let device = DeviceBridge::new(vec!["caiman-no-such-remote".to_string()], None);
        let installer = Installer::new(&project, &device, TargetKind::Dependency);
        let target = dependency("logging", &[]);

        ManifestStore::for_workspace(&project.workspace)
            .save(
                TargetKind::Dependency,
                AssetType::Source,
                "logging",
                &Manifest::new("logging", "1.0"),
            )
            .unwrap();

        let outcome = installer.install(&target, false).unwrap();
        assert!(!outcome.installed);
        assert_eq!(outcome.manifest.version, "1.0");

        let forced = installer.install(&target, true);
        assert!(matches!(forced, Err(InstallError::Command { .. })));
    }

    #[test]
    fn test_modified_install_still_skips_without_force() {
        let temp = TempDir::new().unwrap();
        let project = project(&temp);
        let device = DeviceBridge::new(vec!["caiman-no-such-remote".to_string()], None);
        let installer = Installer::new(&project, &device, TargetKind::Dependency);
        let target = dependency("logging", &[]);

        let root = installer.install_root().to_path_buf();
        filesystem::write_file(&root.join("logging.py"), "v1").unwrap();
        let manifest = Manifest::from_paths("logging", "1.0", &root, ["logging.py"]).unwrap();
        ManifestStore::for_workspace(&project.workspace)
            .save(TargetKind::Dependency, AssetType::Source, "logging", &manifest)
            .unwrap();
        filesystem::write_file(&root.join("logging.py"), "edited").unwrap();

        let outcome = installer.install(&target, false).unwrap();
        assert!(!outcome.installed);
        assert_eq!(outcome.manifest.changed_items(&root).len(), 1);
    }
}
