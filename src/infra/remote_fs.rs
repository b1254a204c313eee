//! Device filesystem operations
//!
//! Plain file transfers go through the remote-control program's own `fs`
//! commands. Recursive listing and removal run as remote function calls into
//! a small helper module that ships inside the binary and is mounted from
//! the workspace artifact area.

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::error::{CommandError, RpcError};
use crate::infra::device::DeviceBridge;
use crate::infra::filesystem;

/// Module name of the device-side helper
pub const HELPER_MODULE: &str = "caiman_fs";

const HELPER_SOURCE: &str = include_str!("remote/caiman_fs.py");

/// Arguments for `fs cp`, uploading `src` to device path `dst`
pub fn upload_args(src: &str, dst: &str, recursive: bool) -> Vec<String> {
    let mut args = vec!["fs".to_string(), "cp".to_string()];
    if recursive {
        args.push("-r".to_string());
    }
    args.push(src.to_string());
    args.push(format!(":{}", dst.trim_matches('/')));
    args
}

/// Each prefix of a device path: `a`, `a/b`, `a/b/c` for `/a/b/c`
pub fn mkdir_steps(path: &str) -> Vec<String> {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    (1..=parts.len()).map(|n| parts[..n].join("/")).collect()
}

/// Filesystem of the attached device
#[derive(Debug)]
pub struct RemoteFs<'a> {
    device: &'a DeviceBridge,
    module_dir: PathBuf,
}

impl<'a> RemoteFs<'a> {
    /// `module_dir` is where the helper module is written before mounting
    pub fn new(device: &'a DeviceBridge, module_dir: impl Into<PathBuf>) -> Self {
        Self {
            device,
            module_dir: module_dir.into(),
        }
    }

    pub fn device(&self) -> &DeviceBridge {
        self.device
    }

    fn ensure_helper(&self) -> Result<(), RpcError> {
        let path = self.module_dir.join(format!("{HELPER_MODULE}.py"));
        let current = std::fs::read_to_string(&path).ok();
        if current.as_deref() != Some(HELPER_SOURCE) {
            filesystem::write_file(&path, HELPER_SOURCE)?;
        }
        Ok(())
    }

    fn call(&self, function: &str, parent: &str) -> Result<Vec<String>, RpcError> {
        self.ensure_helper()?;
        self.device.call_function(
            &self.module_dir,
            HELPER_MODULE,
            function,
            &json!({ "parent": parent }),
        )
    }

    /// Every file below `parent`, depth-first
    pub fn walk(&self, parent: &str) -> Result<Vec<String>, RpcError> {
        self.call("walk", parent)
    }

    /// Remove `parent` recursively, returning the removed paths
    ///
    /// Paths that are ancestors or descendants of the device's working
    /// directory are left in place.
    pub fn rmtree(&self, parent: &str) -> Result<Vec<String>, RpcError> {
        self.call("rmtree", parent)
    }

    /// Upload `src` (relative to `cwd`) to device path `dst`
    pub fn upload(&self, src: &Path, dst: &str, cwd: &Path) -> Result<String, CommandError> {
        let recursive = cwd.join(src).is_dir();
        let args = upload_args(&src.display().to_string(), dst, recursive);
        self.device.run_in(&args, cwd)
    }

    /// Create a device directory and its parents, returning those created
    ///
    /// Existing directories make the remote command fail; those failures are
    /// expected and ignored.
    pub fn mkdir(&self, path: &str) -> Vec<String> {
        mkdir_steps(path)
            .into_iter()
            .filter(|step| {
                let args = vec!["mkdir".to_string(), step.clone()];
                match self.device.run(&args, None) {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::debug!("mkdir {step} skipped: {e}");
                        false
                    }
                }
            })
            .collect()
    }

    /// Contents of a device file
    pub fn cat(&self, path: &str) -> Result<String, CommandError> {
        self.device.run(&["cat".to_string(), path.to_string()], None)
    }

    /// Parse a device file as JSON; a missing file reads as `{}` with `ignore_missing`
    pub fn read_json(&self, path: &str, ignore_missing: bool) -> Result<serde_json::Value, RpcError> {
        let contents = match self.cat(path) {
            Ok(contents) => contents,
            Err(_) if ignore_missing => return Ok(json!({})),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map_err(|e| RpcError::InvalidJson {
            line: contents.trim().to_string(),
            error: e.to_string(),
            output: contents.clone(),
        })
    }
}
