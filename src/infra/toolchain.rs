//! MicroPython cross-compiler
//!
//! Wraps the `mpy-cross` invocation used to turn `.py` sources into `.mpy`
//! bytecode.

use std::path::Path;

use crate::config::defaults;
use crate::error::CompileError;
use crate::infra::process::CommandLine;

/// Cross-compiler wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossCompiler {
    /// Program prefix, e.g. `["mpy-cross"]` or `["python", "-m", "mpy_cross"]`
    program: Vec<String>,
}

impl CrossCompiler {
    /// Create a compiler wrapper from a program prefix
    pub fn new(program: Vec<String>) -> Self {
        Self { program }
    }

    /// The configured program prefix
    pub fn program(&self) -> &[String] {
        &self.program
    }

    /// Command line compiling `source` into `target`
    pub fn command_line(&self, source: &Path, target: &Path) -> CommandLine {
        CommandLine::new(self.program.iter().cloned())
            .arg(source.display().to_string())
            .arg("-o")
            .arg(target.display().to_string())
    }

    /// Compile one file
    ///
    /// The target's parent directory must exist.
    pub fn compile(&self, source: &Path, target: &Path) -> Result<(), CompileError> {
        self.command_line(source, target)
            .output()
            .map(|_| ())
            .map_err(|command| CompileError {
                file: source.to_path_buf(),
                command,
            })
    }
}

impl Default for CrossCompiler {
    fn default() -> Self {
        Self::new(vec![defaults::COMPILER_PROGRAM.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_line_shape() {
        let compiler = CrossCompiler::default();
        let line = compiler.command_line(Path::new("src/a.py"), Path::new("out/a.mpy"));
        assert_eq!(line.argv(), ["mpy-cross", "src/a.py", "-o", "out/a.mpy"]);
    }

    #[test]
    fn test_program_prefix_is_kept() {
        let compiler = CrossCompiler::new(vec!["python".into(), "-m".into(), "mpy_cross".into()]);
        let line = compiler.command_line(Path::new("a.py"), Path::new("a.mpy"));
        assert_eq!(line.argv()[..3], ["python", "-m", "mpy_cross"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_names_the_file() {
        let compiler = CrossCompiler::new(vec![
            "sh".into(),
            "-c".into(),
            "echo 'SyntaxError: bad' >&2; exit 1".into(),
            "compiler".into(),
        ]);

        let err = compiler
            .compile(Path::new("src/broken.py"), Path::new("out/broken.mpy"))
            .unwrap_err();

        assert_eq!(err.file, PathBuf::from("src/broken.py"));
        assert!(err.to_string().contains("SyntaxError: bad"));
    }
}
