//! Smoke tests for the end2end CLI
//!
//! These cover argument handling, scenario loading and configuration errors
//! reported before launch. Only the short-timeout run gets past validation,
//! and it points at a closed port.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the end2end binary with a clean environment
fn end2end() -> Command {
    let mut cmd = Command::cargo_bin("end2end").expect("end2end binary should exist");
    cmd.env_remove("END2END_BASE_URL")
        .env_remove("END2END_HEADLESS")
        .env_remove("END2END_TIMEOUT_MS")
        .env_remove("END2END_POLL_INTERVAL_MS")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_help_flag() {
    end2end()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_version_flag() {
    end2end()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_args_fails() {
    end2end().assert().failure();
}

#[test]
fn test_run_help_lists_flags() {
    end2end()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--scenarios"))
        .stdout(predicate::str::contains("--format"));
}

// ============================================================================
// list
// ============================================================================

#[test]
fn test_list_builtin() {
    end2end()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("homepage has title and heading (3 steps)"))
        .stdout(predicate::str::contains(
            "button increments count when clicked (6 steps)",
        ));
}

#[test]
fn test_list_filter() {
    end2end()
        .args(["list", "--filter", "button"])
        .assert()
        .success()
        .stdout(predicate::str::contains("button increments"))
        .stdout(predicate::str::contains("homepage").not());
}

#[test]
fn test_list_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("extra.yaml");
    fs::write(
        &path,
        "- name: about page\n  steps:\n    - action: navigate\n      url: /about\n    - action: expect_title\n      expected: About\n",
    )
    .unwrap();

    end2end()
        .args(["list", "--scenarios"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("about page (2 steps)"))
        .stdout(predicate::str::contains("homepage").not());
}

#[test]
fn test_list_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "name: x\nsteps:\n  - action: hover\n").unwrap();

    end2end()
        .args(["list", "--scenarios"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.yaml"));
}

#[test]
fn test_list_missing_file() {
    end2end()
        .args(["list", "--scenarios", "/nonexistent/scenarios.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

// ============================================================================
// run: configuration errors are reported before any browser starts
// ============================================================================

#[test]
fn test_run_rejects_non_http_base_url() {
    end2end()
        .args(["run", "--base-url", "ftp://localhost/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base URL"));
}

#[test]
fn test_run_rejects_zero_timeout() {
    end2end()
        .args(["run", "--timeout", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}

#[test]
fn test_run_short_timeout_passes_validation() {
    // Nothing listens on port 9, so the run fails after config validation.
    end2end()
        .args([
            "run",
            "--timeout",
            "50",
            "--navigation-timeout",
            "500",
            "--base-url",
            "http://127.0.0.1:9/",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_ms").not());
}

#[test]
fn test_run_rejects_bad_env() {
    end2end()
        .env("END2END_HEADLESS", "sometimes")
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("END2END_HEADLESS"));
}

#[test]
fn test_run_rejects_unknown_format() {
    end2end()
        .args(["run", "--format", "tap"])
        .assert()
        .failure();
}
