// SPDX-License-Identifier: MIT

use std::time::Duration;

use super::*;

fn record() -> ExecutionRecord {
    ExecutionRecord {
        command: Some("echo".to_string()),
        arguments: vec!["hi".to_string()],
        pid: 4321,
        mode: Mode::Wrapper,
        start_ms: 1_700_000_000_000,
        end_ms: Some(1_700_000_003_000),
        captured_ms: 1_700_000_003_000,
        returncode: Some(0),
        stdin_lines: 0,
        stdout_lines: 1,
        stderr_lines: 0,
        stdin_buffer: String::new(),
        stdout_buffer: "hi".to_string(),
        stderr_buffer: String::new(),
        username: "tester".to_string(),
        hostname: "box".to_string(),
    }
}

#[test]
fn runtime_uses_end_when_set() {
    let rec = record();
    assert_eq!(rec.runtime(), Duration::from_secs(3));
    assert_eq!(rec.runtime_display(), "0:00:03");
}

#[test]
fn runtime_falls_back_to_snapshot_time_while_running() {
    let mut rec = record();
    rec.end_ms = None;
    rec.captured_ms = rec.start_ms + 7_500;
    assert_eq!(rec.runtime(), Duration::from_millis(7_500));
}

#[test]
fn runtime_never_goes_negative() {
    let mut rec = record();
    rec.end_ms = None;
    rec.captured_ms = rec.start_ms - 1;
    assert_eq!(rec.runtime(), Duration::ZERO);
}

#[test]
fn success_requires_zero_exit() {
    assert!(record().success());
    let mut rec = record();
    rec.returncode = Some(1);
    assert!(!rec.success());
    rec.returncode = None;
    assert!(!rec.success());
}

#[test]
fn returncode_sentinel_while_running() {
    let mut rec = record();
    rec.returncode = None;
    assert_eq!(rec.returncode_display(), "<unavailable>");
    rec.returncode = Some(137);
    assert_eq!(rec.returncode_display(), "137");
}

#[test]
fn sink_mode_command_sentinel() {
    let mut rec = record();
    rec.command = None;
    rec.mode = Mode::Sink;
    assert_eq!(rec.command_display(), "<pingback sink>");
}

#[test]
fn display_timestamps_are_formatted() {
    let rec = record();
    // Local-time rendering: check shape, not the absolute value.
    let start = rec.start_display();
    assert_eq!(start.len(), "2023-11-14 22:13:20".len());
    assert_eq!(&start[4..5], "-");
}

#[test]
fn timestamp_is_rfc3339_utc() {
    let rec = record();
    let ts = rec.timestamp();
    assert!(ts.ends_with('Z'), "expected UTC timestamp: {ts}");
    assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
}

#[test]
fn local_identity_is_populated() {
    let (user, host) = local_identity();
    assert!(!user.is_empty());
    assert!(!host.is_empty());
}
