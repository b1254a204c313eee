//! Units of build work
//!
//! Builders turn their inputs into a sequence of tasks; each task knows how
//! to describe itself for progress output and how to run.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::core::workspace::Workspace;
use crate::error::{BuildError, InstallError};
use crate::infra::device::DeviceBridge;
use crate::infra::filesystem;
use crate::infra::toolchain::CrossCompiler;

/// What a file task does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Copy,
    Compile,
    Move,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Copy => "Copying",
            Self::Compile => "Compiling",
            Self::Move => "Moving",
        })
    }
}

/// A single file operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub kind: TaskKind,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl Task {
    pub fn copy(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            kind: TaskKind::Copy,
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn compile(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            kind: TaskKind::Compile,
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn move_file(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            kind: TaskKind::Move,
            source: source.into(),
            target: target.into(),
        }
    }

    /// A copy, or a compile when the projection changed the file extension
    pub fn projected(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let target = target.into();
        if source.extension() == target.extension() {
            Self::copy(source, target)
        } else {
            Self::compile(source, target)
        }
    }

    /// Progress line with workspace-relative paths
    pub fn describe(&self, workspace: &Workspace) -> String {
        format!(
            "{} {} to {}",
            self.kind,
            workspace.display_path(&self.source),
            workspace.display_path(&self.target)
        )
    }

    /// Run the task, returning the produced file
    pub fn execute(&self, compiler: &CrossCompiler) -> Result<&Path, BuildError> {
        match self.kind {
            TaskKind::Copy => filesystem::copy_file(&self.source, &self.target)?,
            TaskKind::Move => filesystem::move_file(&self.source, &self.target)?,
            TaskKind::Compile => {
                if let Some(parent) = self.target.parent() {
                    filesystem::create_dir_all(parent)?;
                }
                compiler.compile(&self.source, &self.target)?;
            }
        }
        Ok(&self.target)
    }
}

/// A channel install run on the device bridge
///
/// Installs one group of packages with the staging directory mounted on the
/// device, so the remote package manager writes into the host staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTask {
    /// `name@version` specs
    pub packages: Vec<String>,
    /// Channel index URL
    pub index: String,
    /// Host staging directory mounted on the device
    pub mount: PathBuf,
    /// Sub-directory of the mount to install into
    pub subdir: PathBuf,
}

impl InstallTask {
    /// Install location as seen from the device
    pub fn remote_target(&self) -> String {
        let sub = crate::core::manifest::manifest_path(&self.subdir);
        if sub.is_empty() {
            defaults::REMOTE_MOUNT.to_string()
        } else {
            format!("{}/{sub}", defaults::REMOTE_MOUNT)
        }
    }

    /// Arguments for the remote package manager
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "mip".to_string(),
            "--no-mpy".to_string(),
            "--index".to_string(),
            self.index.clone(),
            "--target".to_string(),
            self.remote_target(),
            "install".to_string(),
        ];
        args.extend(self.packages.iter().cloned());
        args
    }

    pub fn describe(&self) -> String {
        format!("Installing {} into {}", self.packages.join(", "), self.remote_target())
    }

    /// Run on the device with the staging directory mounted
    pub fn execute(&self, device: &DeviceBridge) -> Result<String, InstallError> {
        filesystem::create_dir_all(&self.mount.join(&self.subdir))?;
        device
            .run(&self.args(), Some(&self.mount))
            .map_err(|source| InstallError::Command {
                package: self.packages.join(", "),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_projected_picks_compile_on_extension_change() {
        assert_eq!(Task::projected("a.py", "a.mpy").kind, TaskKind::Compile);
        assert_eq!(Task::projected("a.py", "a.py").kind, TaskKind::Copy);
        assert_eq!(Task::projected("README", "README").kind, TaskKind::Copy);
    }

    #[test]
    fn test_copy_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        std::fs::write(&source, "x").unwrap();
        let target = temp.path().join("out/deep/a.txt");

        let task = Task::copy(&source, &target);
        let produced = task.execute(&CrossCompiler::default()).unwrap();

        assert_eq!(produced, target.as_path());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "x");
        assert!(source.exists());
    }

    #[test]
    fn test_move_removes_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        std::fs::write(&source, "x").unwrap();
        let target = temp.path().join("moved/a.txt");

        Task::move_file(&source, &target)
            .execute(&CrossCompiler::default())
            .unwrap();

        assert!(!source.exists());
        assert!(target.exists());
    }

    #[test]
    fn test_describe_uses_relative_paths() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path(), &crate::core::config::WorkspaceConfig::default())
            .unwrap();
        let task = Task::compile(
            ws.root().join("src/main.py"),
            ws.root().join("build/board/micropython/main.mpy"),
        );

        assert_eq!(
            task.describe(&ws),
            "Compiling src/main.py to build/board/micropython/main.mpy"
        );
    }

    #[test]
    fn test_install_args() {
        let task = InstallTask {
            packages: vec!["logging@0.6".to_string()],
            index: "https://micropython.org/pi/v2".to_string(),
            mount: PathBuf::from("/tmp/stage"),
            subdir: PathBuf::from("lib"),
        };

        assert_eq!(task.remote_target(), "/remote/lib");
        assert_eq!(
            task.args(),
            vec![
                "mip",
                "--no-mpy",
                "--index",
                "https://micropython.org/pi/v2",
                "--target",
                "/remote/lib",
                "install",
                "logging@0.6",
            ]
        );
    }

    #[test]
    fn test_install_into_mount_root() {
        let task = InstallTask {
            packages: vec!["a@latest".to_string(), "b@latest".to_string()],
            index: "x".to_string(),
            mount: PathBuf::from("/tmp/stage"),
            subdir: PathBuf::new(),
        };
        assert_eq!(task.remote_target(), "/remote");
        assert_eq!(task.args()[7..], ["a@latest", "b@latest"]);
    }
}
