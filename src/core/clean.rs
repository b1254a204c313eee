//! Clean logic
//!
//! Removes both build trees and the artifact staging area. Installed
//! packages, tools and manifests are kept, so the next build does not
//! reinstall anything that is already current.

use std::path::PathBuf;

use crate::core::workspace::Workspace;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Result of clean operation
#[derive(Debug, Default)]
pub struct CleanResult {
    /// Directories that were removed, relative to the workspace root
    pub removed: Vec<String>,
    /// Directories that didn't exist (skipped)
    pub skipped: Vec<String>,
}

/// Directories removed by [`clean_workspace`]
pub fn clean_directories(workspace: &Workspace) -> Vec<PathBuf> {
    vec![
        workspace.asset_root(false),
        workspace.asset_root(true),
        workspace.artifact_root().to_path_buf(),
    ]
}

/// Remove build output and staging directories
pub fn clean_workspace(workspace: &Workspace) -> Result<CleanResult, FilesystemError> {
    let mut result = CleanResult::default();

    for dir in clean_directories(workspace) {
        let shown = workspace.display_path(&dir);
        if filesystem::remove_dir_all(&dir)? {
            tracing::info!("Removed {shown}");
            result.removed.push(shown);
        } else {
            result.skipped.push(shown);
        }
    }

    Ok(result)
}

/// Check if the workspace has anything to clean
pub fn has_build_artifacts(workspace: &Workspace) -> bool {
    clean_directories(workspace).iter().any(|dir| dir.exists())
}
