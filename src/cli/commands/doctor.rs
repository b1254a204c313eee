//! CLI command for `caiman doctor`
//!
//! Reports whether the cross compiler and the remote-control program can be
//! found, and any problems with `caiman.toml`.

use std::path::Path;

use anyhow::{bail, Result};

use crate::cli::output::{is_json, is_quiet, print_detail, print_success, print_warning, status};
use crate::core::doctor::{run_doctor, DoctorReport, ProgramCheck};

fn report_status(report: &DoctorReport) -> &'static str {
    if report.all_passed() {
        "success"
    } else if report.missing().is_empty() {
        "warning"
    } else {
        "error"
    }
}

fn print_json(report: &DoctorReport) {
    let programs: Vec<_> = report
        .programs
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.label,
                "program": c.program,
                "found": c.is_ok(),
                "path": c.location.as_ref().map(|p| p.display().to_string()),
                "version": c.version,
                "error": c.problem(),
                "hint": c.hint,
            })
        })
        .collect();
    let document = serde_json::json!({
        "status": report_status(report),
        "programs": programs,
        "config_issues": report.config_issues,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&document).unwrap_or_default()
    );
}

fn print_check(check: &ProgramCheck) {
    match check.problem() {
        None => {
            let version = check
                .version
                .as_deref()
                .map(|v| format!(" {v}"))
                .unwrap_or_default();
            println!("{} {}{version}", status::SUCCESS, check.label);
        }
        Some(problem) => {
            println!("{} {}", status::ERROR, check.label);
            print_detail(&problem);
            print_detail(&format!("hint: {}", check.hint));
        }
    }
}

/// Execute the doctor command
pub async fn execute(config_path: &Path) -> Result<()> {
    let report = run_doctor(config_path);

    if is_json() {
        print_json(&report);
    } else if is_quiet() {
        for check in report.missing() {
            eprintln!("{} {} not found", status::ERROR, check.label);
        }
    } else {
        for check in &report.programs {
            print_check(check);
        }
        for issue in &report.config_issues {
            print_warning(&format!("{}: {issue}", config_path.display()));
        }
        if report.all_passed() {
            print_success(&format!(
                "{}/{} checks passed",
                report.passed_count(),
                report.programs.len()
            ));
        }
    }

    let missing = report.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|c| c.program.as_str()).collect();
        bail!("Missing required programs: {}", names.join(", "));
    }
    Ok(())
}
