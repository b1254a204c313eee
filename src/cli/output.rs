//! Output formatting and progress indicators
//!
//! Status lines, quiet/verbose/JSON output modes, spinners and the error
//! printer used by `main`.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

static QUIET: AtomicBool = AtomicBool::new(false);
static JSON: AtomicBool = AtomicBool::new(false);
static VERBOSITY: AtomicU8 = AtomicU8::new(0);

/// Output mode selected by the global flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub json: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make this configuration visible to the print helpers
    pub fn apply_global(&self) {
        QUIET.store(self.quiet, Ordering::Relaxed);
        JSON.store(self.json, Ordering::Relaxed);
        VERBOSITY.store(self.verbose, Ordering::Relaxed);
    }

    /// Log level for the tracing subscriber
    ///
    /// Warnings by default, `-v` for info, `-vv` for debug, `-q` for errors only.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

fn is_silent() -> bool {
    is_quiet() || is_json()
}

pub fn print_success(message: &str) {
    if !is_silent() {
        println!("{} {message}", status::SUCCESS);
    }
}

pub fn print_info(message: &str) {
    if !is_silent() {
        println!("{} {message}", status::INFO);
    }
}

/// Warnings go to stderr and survive JSON mode
pub fn print_warning(message: &str) {
    if !is_quiet() {
        eprintln!("{} {message}", status::WARNING);
    }
}

/// Indented detail line under a status line
pub fn print_detail(message: &str) {
    if !is_silent() {
        println!("  {message}");
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  Caused by: {cause}");
    }
}

/// Create a spinner for operations with unknown duration
///
/// Hidden in quiet and JSON modes, and when verbose logging would interleave
/// with it.
pub fn create_spinner(message: &str) -> ProgressBar {
    if is_silent() || verbosity() > 0 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Create a progress bar over build targets
pub fn create_build_bar(total: u64) -> ProgressBar {
    if is_silent() || verbosity() > 0 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} targets ({msg})")
        .map(|style| style.progress_chars("█▓▒░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_follows_flags() {
        assert_eq!(OutputConfig::new(false, false, 0).log_level(), tracing::Level::WARN);
        assert_eq!(OutputConfig::new(false, false, 1).log_level(), tracing::Level::INFO);
        assert_eq!(OutputConfig::new(false, false, 3).log_level(), tracing::Level::DEBUG);
        assert_eq!(OutputConfig::new(true, false, 2).log_level(), tracing::Level::ERROR);
    }
}
