//! Default configuration values

/// Config file name, looked up in the current directory
pub const CONFIG_FILE: &str = "caiman.toml";

/// Build output root, relative to the workspace root
pub const BUILD_DIR: &str = "build/board";

/// Installed dependency packages
pub const PACKAGES_DIR: &str = "venv/mip-packages";

/// Installed tools
pub const TOOLS_DIR: &str = "venv/tools";

/// Persisted manifests
pub const MANIFESTS_DIR: &str = "build/manifests";

/// Quarantine area for packages being fetched
pub const ARTIFACTS_DIR: &str = "build/artifacts";

/// Build tree for modules uploaded to the device filesystem
pub const DEPLOY_CONTAINER: &str = "micropython";

/// Build tree for modules frozen into the firmware image
pub const FROZEN_CONTAINER: &str = "frozen";

/// Ignore patterns applied on top of `.gitignore`
pub const IGNORES: &[&str] = &[".git", ".vscode", "**/__pycache__", "**/*.pyc"];

/// Default package channel
pub const CHANNEL_NAME: &str = "micropython";

/// Default package index
pub const CHANNEL_INDEX: &str = "https://micropython.org/pi/v2";

/// Default version requested for dependencies and tools
pub const DEPENDENCY_VERSION: &str = "latest";

/// Default application version written by `caiman init`
pub const APPLICATION_VERSION: &str = "0.0.1";

/// Default source target
pub const SOURCE_NAME: &str = "micropython";

/// Default source directory
pub const SOURCE_DIR: &str = "src";

/// Remote-control program for the device
pub const REMOTE_PROGRAM: &str = "mpremote";

/// Ahead-of-time bytecode compiler
pub const COMPILER_PROGRAM: &str = "mpy-cross";

/// Source suffix that gets compiled
pub const SOURCE_SUFFIX: &str = ".py";

/// Suffix of compiled bytecode
pub const COMPILED_SUFFIX: &str = ".mpy";

/// Mount point of a local directory on the device
pub const REMOTE_MOUNT: &str = "/remote";

/// Prefix marking the result line of a remote function call
pub const RPC_SENTINEL: &str = ":::";
