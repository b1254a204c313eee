//! Integration tests for global CLI behavior

mod common;

use common::TestProject;

#[test]
fn test_missing_config_suggests_init() {
    let project = TestProject::new();

    let output = project.run(&["build"]);

    assert_eq!(output.status.code(), Some(1));
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("caiman init"), "stderr: {err}");
}

#[test]
fn test_invalid_config_is_reported() {
    let project = TestProject::new();
    project.create_file("caiman.toml", "[workspace]\nbuild = \"../outside\"\n");

    let output = project.run(&["clean"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("outside the workspace"));
}

#[test]
fn test_help_without_subcommand() {
    let project = TestProject::new();

    let output = project.run(&[]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn test_doctor_reports_missing_programs() {
    let project = TestProject::new();
    project.create_file(
        "caiman.toml",
        r#"
[device]
remote = ["caiman-test-no-such-remote"]

[toolchain]
compiler = ["caiman-test-no-such-compiler"]
"#,
    );

    let output = project.run(&["doctor"]);

    assert!(!output.status.success());
    let out = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out.contains("caiman-test-no-such-remote"), "output: {out}");
}

#[cfg(unix)]
#[test]
fn test_config_flag_sets_workspace_root() {
    let project = TestProject::new();
    project.write_config("");
    let config = project.read_file("caiman.toml");
    project.create_file("sub/caiman.toml", &config);
    project.create_file("sub/src/main.py", "print('main')\n");

    let output = project.run(&["build", "--config", "sub/caiman.toml"]);
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(project.file_exists("sub/build/board/micropython/main.mpy"));
    assert!(!project.file_exists("build"));
}

#[cfg(unix)]
#[test]
fn test_config_from_environment() {
    let project = TestProject::new();
    project.write_config("");
    let config = project.read_file("caiman.toml");
    project.create_file("other/caiman.toml", &config);

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_caiman"))
        .current_dir(project.path())
        .env("CAIMAN_CONFIG", "other/caiman.toml")
        .args(["build"])
        .output()
        .expect("Failed to execute caiman");

    assert!(output.status.success());
    assert!(project.file_exists("other/build/manifests/sources/micropython-target.json"));
}
