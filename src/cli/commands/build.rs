//! Build command implementation
//!
//! Implements `caiman build [kind[:name]]`.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::cli::output::{create_spinner, is_json, print_detail, print_success, status};
use crate::core::builder::{BuildContext, BuildPipeline, BuildReport, BuildRequest};

use super::load_project;

/// Execute the build command
pub async fn execute(config_path: &Path, selector: Option<&str>, force: bool) -> Result<()> {
    let project = load_project(config_path)?;
    let request = BuildRequest::parse(selector, force).with_context(|| "Invalid build target")?;
    let ctx = BuildContext::new(&project);

    tracing::info!(
        "Building {}",
        if request.is_unscoped() {
            "everything".to_string()
        } else {
            request.to_string()
        }
    );

    let spinner = create_spinner("Building...");
    let result = BuildPipeline::new().run(&ctx, &request);
    spinner.finish_and_clear();
    let report = result.with_context(|| "Build failed")?;

    print_report(&report);

    if !report.is_success() {
        bail!("{} target(s) failed to build", report.failed.len());
    }
    Ok(())
}

fn print_report(report: &BuildReport) {
    if is_json() {
        let json_result = serde_json::json!({
            "status": if report.is_success() { "success" } else { "error" },
            "built": report.built.iter().map(|b| serde_json::json!({
                "kind": b.kind.to_string(),
                "name": b.name,
                "files": b.target.len(),
            })).collect::<Vec<_>>(),
            "failed": report.failed.iter().map(|(name, e)| serde_json::json!({
                "target": name,
                "error": e.to_string(),
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json_result).unwrap_or_default()
        );
        return;
    }

    for built in &report.built {
        print_success(&format!(
            "Built {}:{} ({} files)",
            built.kind,
            built.name,
            built.target.len()
        ));
    }
    for (name, error) in &report.failed {
        eprintln!("{} {name}: {error}", status::ERROR);
    }
    if report.built.is_empty() && report.failed.is_empty() {
        print_success("Nothing to build");
    } else if report.is_success() {
        print_detail(&format!("{} target(s) built", report.built.len()));
    }
}
