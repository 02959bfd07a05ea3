//! The `weft` binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn weft(
    dir: &Path,
    args: &[&str],
) -> Output {
    let config = dir.join("weft.toml");
    if !config.exists() {
        fs::write(&config, "[log]\nlevel = \"error\"\n").unwrap();
    }
    Command::new(env!("CARGO_BIN_EXE_weft"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run weft")
}

#[test]
fn test_render_with_vars() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("page.html"), "<%= who %> & <%= n + 1 %>").unwrap();
    let output = weft(
        dir.path(),
        &["render", "page.html", "--var", "who=<me>", "--vars", "{\"n\": 2}"],
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "&lt;me&gt; & 3");

    let output = weft(dir.path(), &["render", "page.html", "--var", "who=<me>", "--vars", "{\"n\": 2}", "--no-escape"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "<me> & 3");
}

#[test]
fn test_compile_prints_generated_source() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("page.html"), "<% if x: %>A<% end %>").unwrap();
    let output = weft(dir.path(), &["compile", "page.html"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("if x:\n  __buffer_append("));
}

#[test]
fn test_check_reports_structural_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.html"), "<% for x in xs: %>open").unwrap();
    let output = weft(dir.path(), &["check", "bad.html"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unclosed block"));
    assert!(stderr.contains("0001 : for x in xs:"));
}

#[test]
fn test_version() {
    let dir = tempfile::tempdir().unwrap();
    let output = weft(dir.path(), &["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("weft "));
}
