//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests: a temporary
//! workspace and shell-script stand-ins for the cross compiler and the
//! remote-control program.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test workspaces and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Path of the workspace config
    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("caiman.toml")
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Lines of a tool log, empty when the tool never ran
    pub fn log_lines(&self, name: &str) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join(name))
            .map(|s| s.lines().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Write the fake compiler and remote program, returning their paths
    #[cfg(unix)]
    pub fn install_fakes(&self) -> (PathBuf, PathBuf) {
        let bin = self.dir.path().join("fakebin");
        std::fs::create_dir_all(&bin).expect("Failed to create fake bin directory");

        let compiler = bin.join("fake-mpy-cross");
        let compiler_log = self.dir.path().join("compiler.log");
        write_script(
            &compiler,
            &FAKE_COMPILER.replace("__LOG__", &compiler_log.display().to_string()),
        );

        let remote = bin.join("fake-mpremote");
        let remote_log = self.dir.path().join("remote.log");
        write_script(
            &remote,
            &FAKE_REMOTE.replace("__LOG__", &remote_log.display().to_string()),
        );

        (compiler, remote)
    }

    /// Write a caiman.toml wired to the fake tools, with `extra` appended
    #[cfg(unix)]
    pub fn write_config(&self, extra: &str) {
        let (compiler, remote) = self.install_fakes();
        let content = format!(
            r#"version = "0.0.1"

[application]
name = "test-app"

[device]
remote = ["{remote}"]

[toolchain]
compiler = ["{compiler}"]

{extra}
"#,
            remote = remote.display(),
            compiler = compiler.display(),
        );
        self.create_file("caiman.toml", &content);
    }

    /// Run the caiman binary in the project directory
    pub fn run(&self, args: &[&str]) -> std::process::Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_caiman"));
        cmd.current_dir(self.dir.path());
        cmd.env_remove("CAIMAN_CONFIG");
        cmd.env_remove("RUST_LOG");
        cmd.args(args);
        cmd.output().expect("Failed to execute caiman")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn write_script(path: &Path, content: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, content).expect("Failed to write script");
    let mut perms = std::fs::metadata(path)
        .expect("Failed to stat script")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("Failed to make script executable");
}

/// `fake-mpy-cross <src> -o <dst>`: logs the source and copies it.
/// Sources containing `SYNTAX ERROR` fail like a real compile error.
const FAKE_COMPILER: &str = r#"#!/bin/sh
echo "$1" >> "__LOG__"
if grep -q "SYNTAX ERROR" "$1"; then
    echo "SyntaxError: invalid syntax in $1" >&2
    exit 1
fi
cp "$1" "$3"
"#;

/// Stand-in for mpremote. Logs every invocation, emulates `mip install`
/// into the mounted directory, answers remote calls with sentinel lines and
/// acknowledges file transfers.
const FAKE_REMOTE: &str = r##"#!/bin/sh
echo "$*" >> "__LOG__"
MOUNT=""
if [ "$1" = "connect" ]; then
    shift 2
fi
while [ $# -gt 0 ]; do
    case "$1" in
        soft-reset) shift ;;
        mount) MOUNT="$3"; shift 4 ;;
        *) break ;;
    esac
done
cmd="$1"
shift
case "$cmd" in
    mip)
        target=""
        specs=""
        while [ $# -gt 0 ]; do
            case "$1" in
                --no-mpy|install) shift ;;
                --index) shift 2 ;;
                --target) target="$2"; shift 2 ;;
                +) break ;;
                *) specs="$specs $1"; shift ;;
            esac
        done
        dir="$MOUNT${target#/remote}"
        mkdir -p "$dir"
        for spec in $specs; do
            name="${spec%@*}"
            case "$name" in
                broken*) echo "Package not found: $name" >&2; exit 1 ;;
            esac
            base="${name##*/}"
            case "$base" in
                *.*) file="$base" ;;
                *) file="$base.py" ;;
            esac
            echo "# $spec" > "$dir/$file"
        done
        echo "Done"
        ;;
    exec)
        case "$1" in
            *walk*)
                echo "MicroPython soft reboot"
                echo ':::["/stale"]'
                echo ':::["/lib/a.mpy", "/main.mpy"]'
                ;;
            *rmtree*)
                echo ':::["/lib/a.mpy", "/lib"]'
                ;;
            *"import fail"*)
                echo "Traceback (most recent call last):"
                exit 3
                ;;
            *"import "*)
                echo "hello from device"
                echo "device warning" >&2
                ;;
        esac
        ;;
    fs)
        echo "cp ok"
        ;;
    cat)
        case "$1" in
            /missing*) echo "OSError: [Errno 2] ENOENT" >&2; exit 1 ;;
            *) echo '{"ok": true}' ;;
        esac
        ;;
    mkdir)
        case "$1" in
            lib) exit 1 ;;
        esac
        ;;
    *)
        echo "unknown command $cmd" >&2
        exit 2
        ;;
esac
exit 0
"##;
