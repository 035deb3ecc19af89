use assert_cmd::Command;
use predicates::prelude::*;

/// Help is accepted in both spellings and exits zero without running the
/// workflow.
#[test]
fn test_help_prints_usage() {
    let mut cmd = Command::cargo_bin("rpmsync").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--sync-dir"));
}

#[test]
fn test_short_help_flag() {
    let mut cmd = Command::cargo_bin("rpmsync").unwrap();
    cmd.arg("-h").assert().success().stdout(predicate::str::contains("Usage"));
}

/// Version output carries the crate version.
#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("rpmsync").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Unrecognized arguments are rejected rather than falling through to a
/// normal run.
#[test]
fn test_unknown_flag_is_rejected() {
    let mut cmd = Command::cargo_bin("rpmsync").unwrap();
    cmd.arg("--frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_stray_positional_is_rejected() {
    let mut cmd = Command::cargo_bin("rpmsync").unwrap();
    cmd.arg("install-something").assert().failure();
}

/// --verbose and --quiet are mutually exclusive.
#[test]
fn test_verbose_quiet_conflict() {
    let mut cmd = Command::cargo_bin("rpmsync").unwrap();
    cmd.args(["--verbose", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
