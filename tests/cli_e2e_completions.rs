//! End-to-end tests for the `monobuild completions` command.
//!
//! These tests verify the CLI behavior of the `completions` command by invoking
//! the binary directly and checking its output.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_completions_help() {
    let mut cmd = cargo_bin_cmd!("monobuild");
    cmd.arg("completions")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Generate shell completion scripts",
        ))
        .stdout(predicate::str::contains("bash"))
        .stdout(predicate::str::contains("powershell"));
}

#[test]
fn test_completions_bash() {
    let mut cmd = cargo_bin_cmd!("monobuild");
    cmd.arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("_monobuild()"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("describe"));
}

#[test]
fn test_completions_zsh() {
    let mut cmd = cargo_bin_cmd!("monobuild");
    cmd.arg("completions")
        .arg("zsh")
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef monobuild"));
}

#[test]
fn test_completions_invalid_shell() {
    let mut cmd = cargo_bin_cmd!("monobuild");
    cmd.arg("completions")
        .arg("tcsh")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_invalid_log_level() {
    let mut cmd = cargo_bin_cmd!("monobuild");
    cmd.args(["--log-level", "loud", "completions", "bash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("monobuild");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("monobuild "));
}
