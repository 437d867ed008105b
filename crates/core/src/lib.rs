// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pingback-core: data and rendering layer for the pingback supervisor.
//!
//! Everything in this crate is synchronous and free of network I/O: the
//! bounded line buffers, the immutable execution record snapshot, the layered
//! configuration, and the webhook payload rendering.

pub mod clock;
pub mod config;
pub mod gravatar;
pub mod payload;
pub mod record;
pub mod ring;
pub mod time_fmt;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, ConfigFile};
pub use gravatar::gravatar_url;
pub use payload::{render, EventKind};
pub use record::{local_identity, ExecutionRecord, Mode};
pub use ring::{RingBuffer, StreamCapture, SNIPPET_WIDTH};
pub use time_fmt::format_elapsed;
