//! External process invocation
//!
//! Every tool caiman drives (compiler, device bridge) is configured as an
//! argv prefix, so commands are assembled as plain argument vectors and only
//! turned into `std`/`tokio` commands at the last moment.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use crate::error::CommandError;

/// An argument vector with an optional working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    /// Start from a configured program prefix such as `["mpremote"]`
    pub fn new<I, S>(program: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: program.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in the given directory
    #[must_use]
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// The full argument vector, program first
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Command line for messages
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }

    fn split(&self) -> Result<(&String, &[String]), CommandError> {
        self.argv.split_first().ok_or_else(|| CommandError::Spawn {
            command: String::new(),
            error: "empty command line".to_string(),
        })
    }

    /// Build a blocking command
    pub fn to_std(&self) -> Result<std::process::Command, CommandError> {
        let (program, args) = self.split()?;
        let mut cmd = std::process::Command::new(program);
        cmd.args(args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        Ok(cmd)
    }

    /// Build an async command
    pub fn to_tokio(&self) -> Result<tokio::process::Command, CommandError> {
        let (program, args) = self.split()?;
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        Ok(cmd)
    }

    /// Run to completion, capturing output, and require a zero exit status
    pub fn output(&self) -> Result<Output, CommandError> {
        tracing::debug!("Running: {}", self.display());

        let output = self
            .to_std()?
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.spawn_error(&e))?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(CommandError::Failed {
                command: self.display(),
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    /// Run to completion and return standard output as text
    pub fn stdout(&self) -> Result<String, CommandError> {
        let output = self.output()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub(crate) fn spawn_error(&self, error: &std::io::Error) -> CommandError {
        CommandError::Spawn {
            command: self.display(),
            error: error.to_string(),
        }
    }
}
