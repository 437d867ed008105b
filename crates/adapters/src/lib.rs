// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pingback-adapters: outbound delivery collaborators.

mod webhook;

pub use webhook::{DeliveryError, HttpWebhookAdapter, StdoutWebhookAdapter, WebhookAdapter};

#[cfg(any(test, feature = "test-support"))]
pub use webhook::{FakeWebhookAdapter, WebhookCall};
