//! Integration tests for `caiman build`
//!
//! The cross compiler and remote-control program are shell stand-ins (see
//! `common`), so these tests only run on Unix.

#![cfg(unix)]

mod common;

use common::TestProject;
use predicates::prelude::*;

const APP_SOURCES: &str = r#"
[[sources]]
name = "app"
parent = "src"
files = ["**/*.py", "*.txt"]
"#;

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_build_compiles_and_copies_sources() {
    let project = TestProject::new();
    project.write_config(APP_SOURCES);
    project.create_file("src/a.py", "print('a')\n");
    project.create_file("src/b.txt", "notes\n");
    project.create_file("src/c.json", "{}\n");

    let output = project.run(&["build"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    assert!(project.file_exists("build/board/micropython/a.mpy"));
    assert!(project.file_exists("build/board/micropython/b.txt"));
    assert!(!project.file_exists("build/board/micropython/a.py"));
    assert!(!project.file_exists("build/board/micropython/c.json"));
    assert_eq!(project.log_lines("compiler.log").len(), 1);

    let manifest = project.read_file("build/manifests/sources/app-target.json");
    let doc: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    let paths: Vec<&str> = doc["app"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["a.mpy", "b.txt"]);

    let source_manifest = project.read_file("build/manifests/sources/app-source.json");
    assert!(predicate::str::contains("a.py").eval(&source_manifest));
}

#[test]
fn test_rebuild_is_deterministic() {
    let project = TestProject::new();
    project.write_config(APP_SOURCES);
    project.create_file("src/a.py", "print('a')\n");
    project.create_file("src/lib/util.py", "X = 1\n");

    assert!(project.run(&["build"]).status.success());
    let first = project.read_file("build/manifests/sources/app-target.json");

    assert!(project.run(&["build"]).status.success());
    let second = project.read_file("build/manifests/sources/app-target.json");

    assert_eq!(first, second);
    // No compiler-level caching: every build compiles again
    assert_eq!(project.log_lines("compiler.log").len(), 4);
    assert!(project.file_exists("build/board/micropython/lib/util.mpy"));
}

#[test]
fn test_ignored_files_are_not_built() {
    let project = TestProject::new();
    project.write_config(APP_SOURCES);
    project.create_file(".gitignore", "secret.py\n");
    project.create_file("src/a.py", "print('a')\n");
    project.create_file("src/secret.py", "KEY = 1\n");
    project.create_file("src/__pycache__/a.py", "cached\n");

    let output = project.run(&["build", "sources"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    assert!(project.file_exists("build/board/micropython/a.mpy"));
    assert!(!project.file_exists("build/board/micropython/secret.mpy"));
    assert!(!project.file_exists("build/board/micropython/__pycache__"));
}

#[test]
fn test_compile_error_fails_build() {
    let project = TestProject::new();
    project.write_config(APP_SOURCES);
    project.create_file("src/bad.py", "SYNTAX ERROR\n");

    let output = project.run(&["build"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("SyntaxError"), "stderr: {err}");
    assert!(err.contains("failed to build"), "stderr: {err}");
}

#[test]
fn test_build_continues_past_failed_target() {
    let project = TestProject::new();
    project.write_config(
        r#"
[[sources]]
name = "broken"
parent = "bad"

[[sources]]
name = "good"
parent = "src"
"#,
    );
    project.create_file("bad/x.py", "SYNTAX ERROR\n");
    project.create_file("src/a.py", "print('a')\n");

    let output = project.run(&["build"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("sources:broken"));
    assert!(project.file_exists("build/board/micropython/a.mpy"));
    assert!(project.file_exists("build/manifests/sources/good-target.json"));
}

#[test]
fn test_unknown_target_name_fails() {
    let project = TestProject::new();
    project.write_config(APP_SOURCES);

    let output = project.run(&["build", "sources:nope"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("No buildable sources found for target 'sources:nope'"));
}

#[test]
fn test_unknown_kind_fails() {
    let project = TestProject::new();
    project.write_config(APP_SOURCES);

    let output = project.run(&["build", "firmware"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown target kind 'firmware'"));
}

#[test]
fn test_scoped_build_keeps_other_output() {
    let project = TestProject::new();
    project.write_config(
        r#"
[[sources]]
name = "app"
parent = "src"

[[resources]]
name = "web"
parent = "www"
"#,
    );
    project.create_file("src/a.py", "print('a')\n");
    project.create_file("www/index.html", "<html></html>\n");

    assert!(project.run(&["build"]).status.success());
    assert!(project.file_exists("build/board/micropython/index.html"));

    let output = project.run(&["build", "sources:app"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));
    assert!(project.file_exists("build/board/micropython/index.html"));
    assert!(project.file_exists("build/board/micropython/a.mpy"));
}

#[test]
fn test_full_build_removes_stale_output() {
    let project = TestProject::new();
    project.write_config(APP_SOURCES);
    project.create_file("src/a.py", "print('a')\n");
    project.create_file("build/board/micropython/stale.mpy", "old\n");
    project.create_file("build/board/frozen/stale.mpy", "old\n");

    assert!(project.run(&["build"]).status.success());

    assert!(!project.file_exists("build/board/micropython/stale.mpy"));
    assert!(!project.file_exists("build/board/frozen/stale.mpy"));
    assert!(project.file_exists("build/board/micropython/a.mpy"));
}

#[test]
fn test_frozen_source_goes_to_frozen_tree() {
    let project = TestProject::new();
    project.write_config(
        r#"
[[sources]]
name = "core"
parent = "src"
frozen = true
"#,
    );
    project.create_file("src/core.py", "X = 1\n");

    assert!(project.run(&["build"]).status.success());

    assert!(project.file_exists("build/board/frozen/core.mpy"));
    assert!(!project.file_exists("build/board/micropython/core.mpy"));
}

#[test]
fn test_dependency_is_installed_and_staged() {
    let project = TestProject::new();
    project.write_config(
        r#"
[[sources]]
name = "app"
parent = "src"

[[dependencies]]
name = "logging"
version = "0.5"
"#,
    );

    let output = project.run(&["build"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    let remote = project.log_lines("remote.log");
    assert_eq!(remote.len(), 1);
    assert!(remote[0].contains(
        "mip --no-mpy --index https://micropython.org/pi/v2 --target /remote install logging@0.5"
    ));

    assert!(project.file_exists("venv/mip-packages/logging.py"));
    assert!(project.file_exists("build/board/micropython/logging.mpy"));
    assert!(!project.file_exists("build/artifacts/dependencies/logging"));
    assert!(project.file_exists("build/manifests/dependencies/logging-source.json"));
    assert!(project.file_exists("build/manifests/dependencies/logging-target.json"));

    // Current version: no reinstall, but the build tree is staged again
    assert!(project.run(&["build"]).status.success());
    assert_eq!(project.log_lines("remote.log").len(), 1);
    assert!(project.file_exists("build/board/micropython/logging.mpy"));

    assert!(project.run(&["build", "--force"]).status.success());
    assert_eq!(project.log_lines("remote.log").len(), 2);
}

#[test]
fn test_version_change_reinstalls() {
    let project = TestProject::new();
    project.write_config(
        r#"
[[dependencies]]
name = "logging"
version = "0.5"
"#,
    );
    assert!(project.run(&["build", "dependencies"]).status.success());

    project.write_config(
        r#"
[[dependencies]]
name = "logging"
version = "0.6"
"#,
    );
    assert!(project.run(&["build", "dependencies"]).status.success());

    let remote = project.log_lines("remote.log");
    assert_eq!(remote.len(), 2);
    assert!(remote[1].contains("install logging@0.6"));
}

#[test]
fn test_dependency_files_install_per_directory() {
    let project = TestProject::new();
    project.write_config(
        r#"
[[dependencies]]
name = "github:org/pkg"
version = "1.0"
files = ["lib/a.py", "b.py"]
"#,
    );

    let output = project.run(&["build", "dependencies"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    let remote = project.log_lines("remote.log");
    assert_eq!(remote.len(), 2);
    assert!(remote[0].contains("--target /remote/lib install github:org/pkg/lib/a.py@1.0"));
    assert!(remote[1].contains("--target /remote install github:org/pkg/b.py@1.0"));

    assert!(project.file_exists("venv/mip-packages/lib/a.py"));
    assert!(project.file_exists("venv/mip-packages/b.py"));
    assert!(project.file_exists("build/board/micropython/lib/a.mpy"));
    assert!(project.file_exists("build/manifests/dependencies/pkg-source.json"));
}

#[test]
fn test_failed_install_leaves_live_area_untouched() {
    let project = TestProject::new();
    project.write_config(
        r#"
[[dependencies]]
name = "broken-pkg"
version = "1.0"
"#,
    );

    let output = project.run(&["build", "dependencies"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Package not found"));
    assert!(!project.file_exists("venv/mip-packages"));
    assert!(!project.file_exists("build/manifests/dependencies/broken-pkg-source.json"));
}

#[test]
fn test_tools_install_into_tool_root() {
    let project = TestProject::new();
    project.write_config(
        r#"
[[tools]]
name = "aiorepl"
version = "0.2"
compile = false
"#,
    );

    let output = project.run(&["build", "tools"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    assert!(project.file_exists("venv/tools/aiorepl.py"));
    assert!(!project.file_exists("venv/mip-packages/aiorepl.py"));
    assert!(project.file_exists("build/board/micropython/aiorepl.py"));
    assert!(project.log_lines("compiler.log").is_empty());
}

#[test]
fn test_json_report() {
    let project = TestProject::new();
    project.write_config(APP_SOURCES);
    project.create_file("src/a.py", "print('a')\n");

    let output = project.run(&["build", "--json"]);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["status"], "success");
    assert_eq!(report["built"][0]["name"], "app");
    assert_eq!(report["built"][0]["files"], 1);
}
