// SPDX-License-Identifier: MIT

//! End-to-end specs for the `pingback` binary.
//!
//! Every run sets `PINGBACK_TESTING` so payloads are printed to stdout
//! instead of posted, and points `HOME` at an empty directory so a
//! developer's own `~/.pingback.conf` cannot leak into the assertions.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use tempfile::TempDir;

const HOOK: &str = "https://example.com/hook";

fn pingback(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pingback").expect("pingback binary");
    cmd.env("PINGBACK_TESTING", "1").env("HOME", home.path());
    cmd
}

#[test]
fn wraps_a_command_and_prints_the_final_report() {
    let home = TempDir::new().unwrap();
    let output = pingback(&home)
        .args(["--webhook", HOOK, "--simple", "echo", "hello"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    // The child's own output is forwarded, then the report is printed.
    assert!(stdout.contains("hello"));
    assert!(stdout.contains("just finished after"));
    assert!(stdout.contains(":white_check_mark:"));
}

#[test]
fn failing_child_is_reported_but_still_exits_zero() {
    let home = TempDir::new().unwrap();
    let output = pingback(&home)
        .args(["-w", HOOK, "-s", "sh", "-c", "exit 5"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(":x:"));
    assert!(stdout.contains("just finished after"));
}

#[test]
fn sinks_standard_input_when_no_command_is_given() {
    let home = TempDir::new().unwrap();
    let output = pingback(&home)
        .args(["-w", HOOK, "-s"])
        .write_stdin("one\ntwo\n")
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    // Sink mode passes input through before reporting on it.
    assert!(stdout.contains("one\ntwo\n"));
    assert!(stdout.contains("<pingback sink>"));
    assert!(stdout.contains("just finished after"));
}

#[test]
fn default_rendering_is_an_embed_document() {
    let home = TempDir::new().unwrap();
    let output = pingback(&home)
        .args(["-w", HOOK, "true"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let embeds = doc["embeds"].as_array().unwrap();
    assert_eq!(embeds.len(), 1);
    assert!(embeds[0]["title"].as_str().unwrap().contains("**CMD:**"));
    assert!(embeds[0]["fields"].as_array().unwrap().iter().any(|f| f["name"] == "Return Code"));
}

#[test]
fn missing_webhook_is_a_configuration_error() {
    let home = TempDir::new().unwrap();
    pingback(&home)
        .args(["echo", "hello"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicates::str::contains("webhook"));
}

#[test]
fn invalid_webhook_scheme_is_a_configuration_error() {
    let home = TempDir::new().unwrap();
    pingback(&home)
        .args(["-w", "gopher://example.com", "echo", "hello"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn config_file_layer_supplies_the_webhook() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join(".pingback.conf"),
        format!(r#"{{"webhook": "{HOOK}", "simple": true}}"#),
    )
    .unwrap();

    let output = pingback(&home)
        .args(["echo", "layered"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("just finished after"));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    pingback(&home)
        .args(["-w", HOOK, "pingback-no-such-binary"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    pingback(&home).args(["--no-such-flag"]).assert().failure().code(2);
}

#[test]
fn mistyped_option_is_not_run_as_the_command() {
    let home = TempDir::new().unwrap();
    pingback(&home)
        .args(["-w", HOOK, "--periodicc", "5", "echo", "hi"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicates::str::contains("--periodicc"));
}

#[test]
fn hyphen_arguments_after_the_command_reach_the_child() {
    let home = TempDir::new().unwrap();
    let output = pingback(&home)
        .args(["-w", HOOK, "-s", "printf", "-n", "flagged"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("flagged"));
}

#[test]
fn exits_even_when_stdin_stays_open() {
    use std::process::{Command as StdCommand, Stdio};
    use std::time::{Duration, Instant};

    let home = TempDir::new().unwrap();
    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("pingback"))
        .args(["-w", HOOK, "-s", "true"])
        .env("PINGBACK_TESTING", "1")
        .env("HOME", home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Hold our end of the pipe open: the wrapped `true` exits immediately,
    // and pingback must not wait on a stdin read that will never complete.
    let stdin = child.stdin.take().unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("process did not exit while stdin stayed open");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success());
    drop(stdin);
}
