//! CLI argument parsing tests for stepwise

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn stepwise() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stepwise"))
}

#[test]
fn test_help_flag() {
    stepwise()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("step-by-step coding assistant"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_version_flag() {
    stepwise()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_help() {
    stepwise()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_chat_command_help() {
    stepwise()
        .args(["chat", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--message"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_chat_message_requires_value() {
    stepwise()
        .args(["chat", "-m"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("value is required"));
}

#[test]
fn test_init_rejects_arguments() {
    stepwise()
        .args(["init", "extra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_invalid_command() {
    stepwise()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_invalid_flag() {
    stepwise()
        .args(["status", "--bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}
