//! CLI integration tests (§6.3).
//!
//! These drive the compiled `sillok` binary directly via `assert_cmd`.
//! None of them exercise a real embedding/LLM provider: `--help`/`--version`
//! never reach the network, and the missing-store-directory case fails
//! inside `Store::load` before any provider is constructed.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sillok_cmd() -> Command {
    Command::cargo_bin("sillok").unwrap()
}

#[test]
fn help_lists_repl_flags() {
    sillok_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--store-dir"))
        .stdout(predicate::str::contains("--hide-docs"))
        .stdout(predicate::str::contains("--no-rerank"))
        .stdout(predicate::str::contains("--relax-context"));
}

#[test]
fn version_reports_crate_version() {
    sillok_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sillok"));
}

#[test]
fn missing_store_directory_exits_with_error_before_any_query() {
    let temp_dir = TempDir::new().expect("temp dir");
    let missing = temp_dir.path().join("does-not-exist");

    sillok_cmd()
        .arg("--store-dir")
        .arg(&missing)
        .arg("--api-key")
        .arg("test-key")
        .write_stdin("")
        .assert()
        .failure();
}
