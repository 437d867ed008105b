// SPDX-License-Identifier: MIT

//! Bounded FIFO line buffers for "last N lines" reporting.
//!
//! Each supervised stream (stdin, stdout, stderr) owns one [`StreamCapture`]:
//! a ring buffer of recent lines plus a monotonic line counter. The owning
//! pump is the only writer; report snapshots read a coherent point-in-time
//! copy under the buffer lock, never a torn line.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Display width each captured line is clipped to when rendered into a
/// report, bounding payload size.
pub const SNIPPET_WIDTH: usize = 50;

/// Fixed-capacity FIFO of captured text lines; the oldest line is evicted on
/// overflow. Capacity zero stores nothing.
#[derive(Debug)]
pub struct RingBuffer {
    capacity: usize,
    lines: VecDeque<String>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, lines: VecDeque::with_capacity(capacity) }
    }

    /// Append a line, evicting the oldest one if the buffer is full.
    ///
    /// Trailing newline characters are stripped; [`snapshot`](Self::snapshot)
    /// re-joins lines with `\n`.
    pub fn push(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.trim_end_matches(['\n', '\r']).to_string());
    }

    /// Render the currently held lines in insertion order, each clipped to
    /// [`SNIPPET_WIDTH`] characters.
    pub fn snapshot(&self) -> String {
        self.lines
            .iter()
            .map(|line| clip(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Clip a line to the snippet display width on a character boundary.
fn clip(line: &str) -> &str {
    match line.char_indices().nth(SNIPPET_WIDTH) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Per-stream capture state: a ring buffer of recent lines and a counter of
/// every line ever seen (evicted lines still count).
#[derive(Debug)]
pub struct StreamCapture {
    lines: AtomicU64,
    buffer: Mutex<RingBuffer>,
}

impl StreamCapture {
    pub fn new(capacity: usize) -> Self {
        Self { lines: AtomicU64::new(0), buffer: Mutex::new(RingBuffer::new(capacity)) }
    }

    /// Record one captured line. Called only by the stream's owning pump.
    pub fn record(&self, line: &str) {
        self.buffer.lock().push(line);
        self.lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of lines observed on this stream.
    pub fn line_count(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    /// Point-in-time rendering of the buffered lines.
    pub fn snapshot(&self) -> String {
        self.buffer.lock().snapshot()
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
