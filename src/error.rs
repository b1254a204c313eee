//! Error types for caiman
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
///
/// Raised while loading and validating `caiman.toml`, before any work touches
/// the workspace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file missing
    #[error("Config file not found at '{path}'. Run 'caiman init' to create a workspace.")]
    NotFound { path: PathBuf },

    /// Config file unreadable
    #[error("Failed to read config '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Config file could not be written
    #[error("Failed to write config '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// Config file is not valid TOML or does not match the schema
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A path that must be relative is absolute
    #[error("Path '{path}' must be relative")]
    AbsolutePath { path: PathBuf },

    /// A path resolves outside the workspace root
    #[error("Path '{path}' resolves outside the workspace root '{root}'")]
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    /// Named channel is not declared
    #[error("Channel '{name}' not found")]
    UnknownChannel { name: String },

    /// No channel declared at all
    #[error("No package channels configured")]
    NoChannels,

    /// Glob or ignore pattern failed to compile
    #[error("Invalid pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    /// Target without a name
    #[error("A {kind} target has an empty name")]
    EmptyName { kind: String },

    /// Two targets of the same kind share a name
    #[error("Duplicate {kind} target '{name}'")]
    DuplicateTarget { kind: String, name: String },

    /// Unknown target kind in a build request
    #[error("Unknown target kind '{kind}': expected one of resources, sources, dependencies, tools")]
    UnknownKind { kind: String },
}

/// Failure of an external process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The process could not be started
    #[error("Failed to start `{command}`: {error}")]
    Spawn { command: String, error: String },

    /// The process exited with a non-zero status
    #[error("{}", describe_failure(command, *status, stdout, stderr))]
    Failed {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl CommandError {
    /// The command line that failed
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. } | Self::Failed { command, .. } => command,
        }
    }

    /// Captured standard output (empty when the process never started)
    pub fn stdout(&self) -> &str {
        match self {
            Self::Spawn { .. } => "",
            Self::Failed { stdout, .. } => stdout,
        }
    }

    /// Captured standard error, or the spawn failure reason
    pub fn stderr(&self) -> &str {
        match self {
            Self::Spawn { error, .. } => error,
            Self::Failed { stderr, .. } => stderr,
        }
    }
}

fn describe_failure(command: &str, status: Option<i32>, stdout: &str, stderr: &str) -> String {
    let mut message = match status {
        Some(code) => format!("`{command}` exited with status {code}"),
        None => format!("`{command}` was terminated by a signal"),
    };
    if !stdout.trim().is_empty() {
        message.push_str("\nstdout:\n");
        message.push_str(stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        message.push_str("\nstderr:\n");
        message.push_str(stderr.trim_end());
    }
    message
}

/// Ahead-of-time compiler failure for a single file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to compile '{}': {}", file.display(), command.stderr().trim())]
pub struct CompileError {
    /// Source file that failed to compile
    pub file: PathBuf,
    /// Underlying compiler invocation failure
    #[source]
    pub command: CommandError,
}

/// Manifest store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// Failed to read a manifest file
    #[error("Failed to read manifest '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to write a manifest file
    #[error("Failed to write manifest '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// Manifest file holds invalid JSON
    #[error("Failed to parse manifest '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Failed to hash a file for a manifest item
    #[error("Failed to hash '{path}': {error}")]
    Hash { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to copy a file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to move a file
    #[error("Failed to move '{from}' to '{to}': {error}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to traverse a directory
    #[error("Failed to walk '{path}': {error}")]
    Walk { path: PathBuf, error: String },
}

/// Errors decoding the result of a remote function call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The device program ran but printed no sentinel-prefixed line
    #[error("Remote call produced no result line. Output:\n{output}")]
    NoResult { output: String },

    /// The last sentinel-prefixed line is not valid JSON
    #[error("Remote call returned invalid JSON '{line}': {error}. Output:\n{output}")]
    InvalidJson {
        line: String,
        error: String,
        output: String,
    },

    /// Keyword arguments could not be encoded
    #[error("Failed to encode remote call arguments: {0}")]
    Encode(String),

    /// The device command itself failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The helper module could not be written for mounting
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Package installation errors
///
/// Any of these leaves the live package/tool area untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// Configuration problem (unknown channel)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Remote install command failed
    #[error("Remote install of '{package}' failed: {source}")]
    Command {
        package: String,
        #[source]
        source: CommandError,
    },

    /// Manifest could not be built or saved
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Staging or promotion failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Build pipeline errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A build request named a kind/target that has nothing to build
    #[error("No buildable sources found for target '{target}'")]
    NoBuildables { target: String },

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Compiler failure
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Installation failure
    #[error(transparent)]
    Install(#[from] InstallError),

    /// Manifest failure
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Filesystem failure
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Workspace initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// Directory not found
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// A config file is already present
    #[error("'{path}' already exists. Use --force to overwrite it")]
    ConfigExists { path: PathBuf },

    /// IO error during initialization
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Generated config failed to parse
    #[error("Failed to create config: {0}")]
    Config(#[from] ConfigError),
}

/// Firmware upload errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// The build tree could not be listed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// An upload command failed
    #[error(transparent)]
    Command(#[from] CommandError),
}
