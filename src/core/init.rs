//! Workspace initialization logic
//!
//! Writes a commented `caiman.toml`, creates the default source directory
//! and adds the build and virtual-environment directories to `.gitignore`.

use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::core::config::Config;
use crate::error::{ConfigError, InitError};

/// Entries to add to .gitignore
pub const GITIGNORE_ENTRIES: &[&str] = &["build/", "venv/"];

/// Marker comment for the caiman section in .gitignore
pub const GITIGNORE_MARKER: &str = "# caiman";

/// Options for workspace initialization
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Application name; defaults to the directory name
    pub name: Option<String>,
    pub author: Option<String>,
    /// Overwrite an existing config
    pub force: bool,
}

/// Result of initialization
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created config
    pub config_path: PathBuf,
    /// Application name written to the config
    pub name: String,
    /// Whether .gitignore was created or updated
    pub gitignore_updated: bool,
}

fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

/// Generate the default config content with comments
pub fn generate_config_content(name: &str, author: Option<&str>) -> String {
    let author_line = match author {
        Some(author) => format!("author = {}", toml_string(author)),
        None => "# author = \"Jane Doe\"".to_string(),
    };

    format!(
        r#"# Caiman workspace configuration
version = "{version}"

[application]
name = {name}
version = "{version}"
{author_line}

[device]
# Serial port of the board; auto-detected when unset
# port = "/dev/ttyUSB0"
remote = ["{remote}"]

[toolchain]
compiler = ["{compiler}"]

[workspace]
build = "{build}"
packages = "{packages}"
tools = "{tools}"
manifests = "{manifests}"
artifacts = "{artifacts}"

[[channels]]
name = "{channel}"
index = "{index}"

[[sources]]
name = "{source_name}"
parent = "{source_dir}"
# files = ["**/*.py"]
# frozen = false
# compile = true

# [[resources]]
# name = "web"
# parent = "web"

# [[dependencies]]
# name = "logging"
# version = "latest"
"#,
        version = defaults::APPLICATION_VERSION,
        name = toml_string(name),
        remote = defaults::REMOTE_PROGRAM,
        compiler = defaults::COMPILER_PROGRAM,
        build = defaults::BUILD_DIR,
        packages = defaults::PACKAGES_DIR,
        tools = defaults::TOOLS_DIR,
        manifests = defaults::MANIFESTS_DIR,
        artifacts = defaults::ARTIFACTS_DIR,
        channel = defaults::CHANNEL_NAME,
        index = defaults::CHANNEL_INDEX,
        source_name = defaults::SOURCE_NAME,
        source_dir = defaults::SOURCE_DIR,
    )
}

/// Generate .gitignore content for caiman
pub fn generate_gitignore_content() -> String {
    let mut content = String::from(GITIGNORE_MARKER);
    content.push('\n');
    for entry in GITIGNORE_ENTRIES {
        content.push_str(entry);
        content.push('\n');
    }
    content
}

/// Append caiman entries to existing .gitignore content
pub fn append_gitignore_entries(existing: &str) -> String {
    if existing.contains(GITIGNORE_MARKER) {
        return existing.to_string();
    }

    let mut result = existing.to_string();
    if !result.is_empty() && !result.ends_with('\n') {
        result.push('\n');
    }
    if !result.is_empty() {
        result.push('\n');
    }
    result.push_str(&generate_gitignore_content());
    result
}

/// Derive the application name from the directory
pub fn derive_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string)
        .unwrap_or_else(|| "application".to_string())
}

fn io_error(path: &Path, e: &std::io::Error) -> InitError {
    InitError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

/// Initialize a workspace in `path`
pub fn init_workspace(path: &Path, options: &InitOptions) -> Result<InitResult, InitError> {
    if !path.is_dir() {
        return Err(InitError::DirectoryNotFound {
            path: path.to_path_buf(),
        });
    }

    let config_path = path.join(defaults::CONFIG_FILE);
    if config_path.exists() && !options.force {
        return Err(InitError::ConfigExists { path: config_path });
    }

    let name = options.name.clone().unwrap_or_else(|| {
        let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        derive_name(&absolute)
    });
    let content = generate_config_content(&name, options.author.as_deref());
    let config = Config::from_toml(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;

    std::fs::write(&config_path, &content).map_err(|e| io_error(&config_path, &e))?;
    tracing::info!("Wrote {}", config_path.display());

    let source_dir = path.join(defaults::SOURCE_DIR);
    std::fs::create_dir_all(&source_dir).map_err(|e| io_error(&source_dir, &e))?;

    let gitignore_path = path.join(".gitignore");
    let existing = match std::fs::read_to_string(&gitignore_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(io_error(&gitignore_path, &e)),
    };
    let updated = append_gitignore_entries(&existing);
    let gitignore_updated = updated != existing;
    if gitignore_updated {
        std::fs::write(&gitignore_path, updated).map_err(|e| io_error(&gitignore_path, &e))?;
    }

    Ok(InitResult {
        config_path,
        name,
        gitignore_updated,
    })
}
