use std::path::Path;
use std::process::{Command, Output};

fn dustlink_cmd(fixture: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dustlink"));
    cmd.current_dir(Path::new("tests/fixtures").join(fixture));
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn compile_rewrites_partials_and_exports_name() {
    let output = dustlink_cmd("basic")
        .args(["compile", "templates/home/index.dust"])
        .output()
        .unwrap();
    assert!(output.status.success(), "compile failed: {}", stderr(&output));

    let code = stdout(&output);
    assert!(code.starts_with("var dust = require(\"dustjs-linkedin\");\n"));
    assert!(code.contains("clock.dust\");\n"), "missing clock require:\n{code}");
    assert!(code.contains("page-header.dust\");\n"), "missing header require:\n{code}");
    assert!(code.contains("{>home-widgets-clock/}"));
    assert!(code.contains("{>shared-page-header title=\\\"Home\\\"/}"));
    assert!(code.contains("{>\\\"./cards/{kind}\\\"/}"), "interpolated partial changed:\n{code}");
    assert!(code.ends_with("module.exports = \"home\";\n"));
}

#[test]
fn name_prints_canonical_identifier() {
    let output = dustlink_cmd("basic")
        .args(["name", "templates/shared/page-header.dust"])
        .output()
        .unwrap();
    assert!(output.status.success(), "name failed: {}", stderr(&output));
    assert_eq!(stdout(&output), "shared-page-header\n");
}

#[test]
fn resolve_finds_hyphenated_file() {
    let output = dustlink_cmd("basic")
        .args(["resolve", "shared-page-header"])
        .output()
        .unwrap();
    assert!(output.status.success(), "resolve failed: {}", stderr(&output));
    let printed = stdout(&output);
    assert!(
        Path::new(printed.trim()).ends_with("templates/shared/page-header.dust"),
        "unexpected path: {printed}"
    );
}

#[test]
fn deps_json_lists_resolved_files() {
    let output = dustlink_cmd("basic")
        .args(["deps", "templates/home/index.dust", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "deps failed: {}", stderr(&output));

    let listing: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(listing["identifier"], "home");
    let deps = listing["dependencies"].as_array().unwrap();
    assert_eq!(deps.len(), 2);
    assert!(deps[0].as_str().unwrap().ends_with("clock.dust"));
}

#[test]
fn build_writes_every_template() {
    let out = tempfile::TempDir::new().unwrap();
    let output = dustlink_cmd("basic")
        .args(["build", "--out-dir"])
        .arg(out.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    for name in ["home", "home-widgets-clock", "shared-page-header"] {
        assert!(out.path().join(format!("{name}.js")).is_file(), "{name}.js not built");
    }
}

#[test]
fn unresolved_partial_fails_with_diagnostic() {
    let output = dustlink_cmd("unresolved")
        .args(["compile", "page.dust"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Unresolved Reference"), "unexpected stderr: {err}");
    assert!(err.contains("missing-partial"));
}
