// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pingback-engine: process supervision and notification emission.
//!
//! The [`Supervisor`] spawns and observes one child command (or sinks
//! standard input), pumps its streams through bounded capture buffers,
//! drives the periodic and timeout timers, and sequences shutdown. Every
//! lifecycle event snapshots an execution record and hands it to the
//! [`Emitter`] for one best-effort webhook delivery.

mod emitter;
mod error;
mod supervisor;

pub use emitter::{EmitError, Emitter};
pub use error::SuperviseError;
pub use supervisor::{ControlHandle, State, Supervisor};
