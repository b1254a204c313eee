//! Device bridge
//!
//! Drives the remote-control program (`mpremote` by default) that talks to a
//! MicroPython board over serial. Commands are chained the way the program
//! expects:
//!
//! ```text
//! mpremote [connect <port>] [mount -l <dir> +] <args...> + disconnect
//! ```
//!
//! Mounting a host directory makes it visible on the device under `/remote`,
//! which is how packages are installed into host staging areas and how the
//! helper module for remote filesystem calls reaches the board.
//!
//! Remote function calls print their JSON result on a line prefixed with
//! `:::`; [`parse_rpc_result`] picks the last such line out of the output.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::defaults;
use crate::core::config::DeviceConfig;
use crate::error::{CommandError, RpcError};
use crate::infra::process::CommandLine;

/// Connection to a MicroPython device through the remote-control program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBridge {
    program: Vec<String>,
    port: Option<String>,
}

impl DeviceBridge {
    pub fn new(program: Vec<String>, port: Option<String>) -> Self {
        Self { program, port }
    }

    /// A blank port (e.g. from an unset `${VAR}`) means auto-detect
    pub fn from_config(config: &DeviceConfig) -> Self {
        let port = config
            .port
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string);
        Self::new(config.remote.clone(), port)
    }

    pub fn program(&self) -> &[String] {
        &self.program
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Assemble the full command line for `args`
    pub fn command_line(&self, args: &[String], mount: Option<&Path>) -> CommandLine {
        let mut line = CommandLine::new(self.program.iter().cloned());
        if let Some(port) = &self.port {
            line = line.arg("connect").arg(port.clone());
        }
        if let Some(dir) = mount {
            line = line.args(mount_args(dir));
        }
        line.args(args.iter().cloned()).args(["+", "disconnect"])
    }

    /// Run a command to completion and return its standard output
    pub fn run(&self, args: &[String], mount: Option<&Path>) -> Result<String, CommandError> {
        let line = self.command_line(args, mount);
        tracing::info!("Running command: {}", line.display());
        line.stdout()
    }

    /// Run a command in `cwd`, returning its standard output
    pub fn run_in(&self, args: &[String], cwd: &Path) -> Result<String, CommandError> {
        let line = self.command_line(args, None).cwd(cwd);
        tracing::info!("Running command: {}", line.display());
        line.stdout()
    }

    /// Run a command, streaming its output to this process's stdout/stderr
    ///
    /// Returns the child's exit code instead of failing on non-zero status,
    /// so callers can exit with the same code.
    pub async fn follow(&self, args: &[String], mount: Option<&Path>) -> Result<i32, CommandError> {
        let mut stdout = std::io::stdout();
        let mut stderr = std::io::stderr();
        self.follow_into(args, mount, &mut stdout, &mut stderr).await
    }

    /// [`follow`](Self::follow) with explicit sinks
    pub async fn follow_into<O, E>(
        &self,
        args: &[String],
        mount: Option<&Path>,
        out: &mut O,
        err: &mut E,
    ) -> Result<i32, CommandError>
    where
        O: Write,
        E: Write,
    {
        let line = self.command_line(args, mount);
        tracing::info!("Following command: {}", line.display());

        let mut child = line
            .to_tokio()?
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| line.spawn_error(&e))?;

        let missing_pipe = || CommandError::Spawn {
            command: line.display(),
            error: "output pipe not captured".to_string(),
        };
        let mut out_lines = BufReader::new(child.stdout.take().ok_or_else(missing_pipe)?).lines();
        let mut err_lines = BufReader::new(child.stderr.take().ok_or_else(missing_pipe)?).lines();
        let mut out_open = true;
        let mut err_open = true;

        while out_open || err_open {
            tokio::select! {
                next = out_lines.next_line(), if out_open => match next {
                    Ok(Some(text)) => forward(out, &text),
                    _ => out_open = false,
                },
                next = err_lines.next_line(), if err_open => match next {
                    Ok(Some(text)) => forward(err, &text),
                    _ => err_open = false,
                },
                else => break,
            }
        }

        let status = child.wait().await.map_err(|e| line.spawn_error(&e))?;
        Ok(status.code().unwrap_or(1))
    }

    /// Execute Python statements on the device
    ///
    /// Statements are joined with `;`. With `reset`, the board is
    /// soft-reset first; with `mount`, the directory is mounted so the code
    /// can import modules from it.
    pub fn exec_code(
        &self,
        code: &[String],
        mount: Option<&Path>,
        reset: bool,
    ) -> Result<String, CommandError> {
        self.run(&exec_args(code, mount, reset), None)
    }

    /// Import `module` on the device, streaming its output until it exits
    pub async fn run_module(&self, module: &str) -> Result<i32, CommandError> {
        let code = vec![format!("import {module}")];
        self.follow(&exec_args(&code, None, true), None).await
    }

    /// Call `module.function(**kwargs)` on the device and decode its result
    ///
    /// `module_dir` is mounted so the device can import `module` from it.
    pub fn call_function<T: DeserializeOwned>(
        &self,
        module_dir: &Path,
        module: &str,
        function: &str,
        kwargs: &serde_json::Value,
    ) -> Result<T, RpcError> {
        let code = rpc_program(module, function, kwargs)?;
        let output = self.exec_code(&code, Some(module_dir), true)?;
        let value = parse_rpc_result(&output)?;
        serde_json::from_value(value.clone()).map_err(|e| RpcError::InvalidJson {
            line: value.to_string(),
            error: e.to_string(),
            output,
        })
    }
}

impl Default for DeviceBridge {
    fn default() -> Self {
        Self::new(vec![defaults::REMOTE_PROGRAM.to_string()], None)
    }
}

fn forward<W: Write>(sink: &mut W, text: &str) {
    // A closed console is not a reason to abort the device program
    let _ = writeln!(sink, "{text}");
    let _ = sink.flush();
}

fn mount_args(dir: &Path) -> [String; 4] {
    [
        "mount".to_string(),
        "-l".to_string(),
        dir.display().to_string(),
        "+".to_string(),
    ]
}

/// Arguments for executing `code` with optional reset and mount
pub fn exec_args(code: &[String], mount: Option<&Path>, reset: bool) -> Vec<String> {
    let mut args = Vec::new();
    if reset {
        args.push("soft-reset".to_string());
    }
    if let Some(dir) = mount {
        args.extend(mount_args(dir));
    }
    args.push("exec".to_string());
    args.push(code.join(";"));
    args
}

/// Quote a string as a single-quoted Python literal
pub fn python_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Statements that call `module.function(**kwargs)` and print the result
pub fn rpc_program(
    module: &str,
    function: &str,
    kwargs: &serde_json::Value,
) -> Result<Vec<String>, RpcError> {
    if !kwargs.is_object() {
        return Err(RpcError::Encode(format!(
            "keyword arguments must be a JSON object, got {kwargs}"
        )));
    }
    let encoded = serde_json::to_string(kwargs).map_err(|e| RpcError::Encode(e.to_string()))?;
    Ok(vec![
        format!("from {module} import {function}"),
        "import json".to_string(),
        format!(
            "print({sentinel} + json.dumps({function}(**json.loads({args}))))",
            sentinel = python_string_literal(defaults::RPC_SENTINEL),
            args = python_string_literal(&encoded),
        ),
    ])
}

/// Decode the JSON carried by the last sentinel-prefixed line of `output`
pub fn parse_rpc_result(output: &str) -> Result<serde_json::Value, RpcError> {
    let line = output
        .lines()
        .filter_map(|line| line.trim_end_matches('\r').strip_prefix(defaults::RPC_SENTINEL))
        .last()
        .ok_or_else(|| RpcError::NoResult {
            output: output.to_string(),
        })?;
    serde_json::from_str(line).map_err(|e| RpcError::InvalidJson {
        line: line.to_string(),
        error: e.to_string(),
        output: output.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_command_line_without_port() {
        let device = DeviceBridge::default();
        let line = device.command_line(&strings(&["fs", "ls"]), None);
        assert_eq!(line.argv(), ["mpremote", "fs", "ls", "+", "disconnect"]);
    }

    #[test]
    fn test_blank_port_is_auto_detect() {
        for raw in ["[device]\nport = \"\"\n", "[device]\nport = \"${CAIMAN_TEST_UNSET_PORT}\"\n"] {
            let config = crate::core::config::Config::from_toml_with_env(raw).unwrap();
            let device = DeviceBridge::from_config(&config.device);

            assert_eq!(device.port(), None);
            let line = device.command_line(&strings(&["exec", "pass"]), None);
            assert_eq!(line.argv(), ["mpremote", "exec", "pass", "+", "disconnect"]);
        }
    }

    #[test]
    fn test_configured_port_is_trimmed() {
        let config = DeviceConfig {
            port: Some(" /dev/ttyACM0 ".to_string()),
            ..DeviceConfig::default()
        };
        assert_eq!(DeviceBridge::from_config(&config).port(), Some("/dev/ttyACM0"));
    }

    #[test]
    fn test_command_line_with_port_and_mount() {
        let device = DeviceBridge::new(strings(&["mpremote"]), Some("/dev/ttyUSB0".into()));
        let line = device.command_line(&strings(&["exec", "pass"]), Some(Path::new("/tmp/m")));
        assert_eq!(
            line.argv(),
            [
                "mpremote",
                "connect",
                "/dev/ttyUSB0",
                "mount",
                "-l",
                "/tmp/m",
                "+",
                "exec",
                "pass",
                "+",
                "disconnect"
            ]
        );
    }

    #[test]
    fn test_exec_args_order() {
        let code = strings(&["import os", "print(1)"]);
        let args = exec_args(&code, Some(Path::new("/h")), true);
        assert_eq!(
            args,
            ["soft-reset", "mount", "-l", "/h", "+", "exec", "import os;print(1)"]
        );
        assert_eq!(exec_args(&code, None, false), ["exec", "import os;print(1)"]);
    }

    #[test]
    fn test_rpc_program() {
        let code = rpc_program("caiman_fs", "walk", &json!({"path": "/lib"})).unwrap();
        assert_eq!(code[0], "from caiman_fs import walk");
        assert_eq!(code[1], "import json");
        assert_eq!(
            code[2],
            r#"print(':::' + json.dumps(walk(**json.loads('{"path":"/lib"}'))))"#
        );
    }

    #[test]
    fn test_rpc_program_escapes_quotes() {
        let code = rpc_program("m", "f", &json!({"path": "it's"})).unwrap();
        assert!(code[2].contains(r#"json.loads('{"path":"it\'s"}')"#));
    }

    #[test]
    fn test_rpc_program_requires_object() {
        assert!(matches!(
            rpc_program("m", "f", &json!([1, 2])),
            Err(RpcError::Encode(_))
        ));
    }

    #[test]
    fn test_parse_takes_last_sentinel_line() {
        let output = "soft reboot\n:::[1]\nnoise\n:::{\"ok\": true}\r\nMicroPython v1.22\n";
        assert_eq!(parse_rpc_result(output).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_parse_without_sentinel_fails() {
        let result = parse_rpc_result("Traceback (most recent call last):\n");
        assert!(matches!(result, Err(RpcError::NoResult { .. })));
    }

    #[test]
    fn test_parse_invalid_json_fails() {
        let result = parse_rpc_result(":::not json\n");
        assert!(matches!(result, Err(RpcError::InvalidJson { .. })));
    }

    #[test]
    fn test_python_literal_escapes() {
        assert_eq!(python_string_literal(r"a'b\c"), r"'a\'b\\c'");
        assert_eq!(python_string_literal("x\ny"), r"'x\ny'");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follow_streams_and_returns_exit_code() {
        let device = DeviceBridge::new(
            strings(&["sh", "-c", "echo hello; echo oops >&2; exit 4", "remote"]),
            None,
        );
        let mut out = Vec::new();
        let mut err = Vec::new();

        let code = device
            .follow_into(&[], None, &mut out, &mut err)
            .await
            .unwrap();

        assert_eq!(code, 4);
        assert_eq!(String::from_utf8(out).unwrap(), "hello\n");
        assert_eq!(String::from_utf8(err).unwrap(), "oops\n");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let device = DeviceBridge::new(strings(&["caiman-no-such-remote"]), None);
        let result = device.run(&strings(&["fs", "ls"]), None);
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_parse_recovers_last_payload(
            noise in prop::collection::vec("[a-zA-Z ]{0,20}", 0..4),
            first in any::<i64>(),
            last in any::<i64>(),
        ) {
            let mut output = String::new();
            output.push_str(&format!(":::{first}\n"));
            for line in &noise {
                output.push_str(line);
                output.push('\n');
            }
            output.push_str(&format!(":::{last}\n"));

            prop_assert_eq!(parse_rpc_result(&output).unwrap(), json!(last));
        }
    }
}
