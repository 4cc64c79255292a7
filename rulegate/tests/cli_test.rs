//! Tests for the inspection binary.
use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_help_lists_options_and_config() -> Result<()> {
    let mut cmd = Command::cargo_bin("rulegate-bin")?;
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--plugin"))
        .stdout(predicate::str::contains("--disable-family"))
        .stdout(predicate::str::contains("[rulegate.toggle]"));
    Ok(())
}

#[test]
fn test_empty_host_reports_no_plugins() -> Result<()> {
    let temp = TempDir::new()?;
    let mut cmd = Command::cargo_bin("rulegate-bin")?;
    cmd.current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No plugins loaded."));
    Ok(())
}

#[test]
fn test_json_lists_skipped_locations_and_policy() -> Result<()> {
    let temp = TempDir::new()?;
    fs::write(
        temp.path().join(".rulegate.toml"),
        r#"
[rulegate]
plugin_paths = ["plugins/missing.so"]
disabled_families = ["legacy"]
"#,
    )?;

    let mut cmd = Command::cargo_bin("rulegate-bin")?;
    let output = cmd
        .current_dir(temp.path())
        .args(["--json", "--disable", "CC0001"])
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["plugins"].as_array().map(Vec::len), Some(0));
    assert_eq!(report["skipped"].as_array().map(Vec::len), Some(1));
    assert!(report["skipped"][0]["reason"]
        .as_str()
        .is_some_and(|r| r.contains("not found")));
    assert_eq!(report["disabled_families"][0], "legacy");
    assert_eq!(report["disabled_diagnostics"][0], "CC0001");
    Ok(())
}

#[test]
fn test_explicit_config_must_parse() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("broken.toml");
    fs::write(&path, "[rulegate\n")?;

    let mut cmd = Command::cargo_bin("rulegate-bin")?;
    cmd.arg("--config")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse"));
    Ok(())
}

#[test]
fn test_unknown_flag_fails() -> Result<()> {
    let mut cmd = Command::cargo_bin("rulegate-bin")?;
    cmd.arg("--no-such-flag").assert().code(1);
    Ok(())
}
