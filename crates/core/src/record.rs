// SPDX-License-Identifier: MIT

//! Immutable execution snapshots.
//!
//! An [`ExecutionRecord`] is built fresh from the supervisor's live counters,
//! buffers and child status every time a notification is emitted, and
//! discarded once the payload is rendered. All derived values (elapsed
//! runtime, display timestamps, success flag) are computed from the frozen
//! fields, so a record never changes after construction.

use std::time::Duration;

use chrono::{DateTime, Local, SecondsFormat, Utc};

use crate::time_fmt::format_elapsed;

/// How the supervisor is driving this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No child command: standard input is consumed and passed through.
    Sink,
    /// A child command is spawned and its three streams are bridged.
    Wrapper,
}

/// Point-in-time snapshot of a supervised run.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    /// Child command name; `None` in sink mode.
    pub command: Option<String>,
    /// Arguments passed to the child (exclusive of the command name).
    pub arguments: Vec<String>,
    /// Child pid, or the supervisor's process-group id in sink mode.
    pub pid: i32,
    pub mode: Mode,
    /// Epoch milliseconds when supervision started.
    pub start_ms: u64,
    /// Epoch milliseconds when shutdown recorded the end of the run;
    /// `None` while still running.
    pub end_ms: Option<u64>,
    /// Epoch milliseconds when this snapshot was taken.
    pub captured_ms: u64,
    /// Child exit code; `None` until the child has exited.
    pub returncode: Option<i32>,
    pub stdin_lines: u64,
    pub stdout_lines: u64,
    pub stderr_lines: u64,
    pub stdin_buffer: String,
    pub stdout_buffer: String,
    pub stderr_buffer: String,
    pub username: String,
    pub hostname: String,
}

impl ExecutionRecord {
    /// Elapsed runtime: end − start, or snapshot-time − start while running.
    pub fn runtime(&self) -> Duration {
        let end = self.end_ms.unwrap_or(self.captured_ms);
        Duration::from_millis(end.saturating_sub(self.start_ms))
    }

    pub fn runtime_display(&self) -> String {
        format_elapsed(self.runtime())
    }

    /// Did the child exit cleanly? Always false while running.
    pub fn success(&self) -> bool {
        self.returncode == Some(0)
    }

    /// Exit code rendered for reports; an explicit sentinel while the child
    /// has not exited rather than a numeric placeholder.
    pub fn returncode_display(&self) -> String {
        match self.returncode {
            Some(code) => code.to_string(),
            None => "<unavailable>".to_string(),
        }
    }

    /// Command name for report titles; a sentinel in sink mode.
    pub fn command_display(&self) -> &str {
        self.command.as_deref().unwrap_or("<pingback sink>")
    }

    pub fn start_display(&self) -> String {
        format_local(self.start_ms)
    }

    /// End timestamp; renders the snapshot time while the run is still live.
    pub fn end_display(&self) -> String {
        format_local(self.end_ms.unwrap_or(self.captured_ms))
    }

    /// RFC-3339 UTC timestamp of the snapshot, for the embed `timestamp` key.
    pub fn timestamp(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.captured_ms as i64)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

fn format_local(epoch_ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms as i64)
        .unwrap_or_default()
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Invoking user and host, as reported in every record.
pub fn local_identity() -> (String, String) {
    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string());
    (username, hostname)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
