// SPDX-License-Identifier: MIT

//! Webhook delivery adapter.
//!
//! Accepts a fully serialized JSON document and a destination URL, makes one
//! delivery attempt and reports the outcome. Callers treat delivery as
//! best-effort: failures are logged upstream, never retried.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a delivery attempt
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid webhook url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("webhook returned status {status}")]
    Status { status: u16 },

    #[error("webhook transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Adapter for delivering a payload document to a webhook endpoint
#[async_trait]
pub trait WebhookAdapter: Clone + Send + Sync + 'static {
    /// Deliver one payload. Exactly one attempt; no retries.
    async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<(), DeliveryError>;
}

/// HTTP delivery via reqwest.
///
/// A bounded request timeout keeps a stalled webhook from holding up
/// shutdown; the supervisor never waits on delivery longer than this.
#[derive(Clone, Debug)]
pub struct HttpWebhookAdapter {
    client: reqwest::Client,
}

impl HttpWebhookAdapter {
    pub fn new() -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookAdapter for HttpWebhookAdapter {
    async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<(), DeliveryError> {
        let url = reqwest::Url::parse(url).map_err(|err| DeliveryError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        tracing::debug!(%url, "delivering webhook payload");
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status { status: status.as_u16() });
        }
        Ok(())
    }
}

/// Dry-run adapter: prints the payload instead of posting it.
///
/// Selected by the CLI when `PINGBACK_TESTING` is set, so end-to-end tests
/// can assert on payloads without a live endpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutWebhookAdapter;

#[async_trait]
impl WebhookAdapter for StdoutWebhookAdapter {
    async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<(), DeliveryError> {
        let rendered =
            serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        tracing::debug!(%url, "dry-run webhook delivery");
        println!("{rendered}");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{DeliveryError, WebhookAdapter};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded delivery attempt
    #[derive(Debug, Clone)]
    pub struct WebhookCall {
        pub url: String,
        pub payload: serde_json::Value,
    }

    /// Fake webhook adapter for testing
    #[derive(Clone, Default)]
    pub struct FakeWebhookAdapter {
        inner: Arc<Mutex<Vec<WebhookCall>>>,
    }

    impl FakeWebhookAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// All recorded delivery attempts, in order
        pub fn calls(&self) -> Vec<WebhookCall> {
            self.inner.lock().clone()
        }
    }

    #[async_trait]
    impl WebhookAdapter for FakeWebhookAdapter {
        async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<(), DeliveryError> {
            self.inner
                .lock()
                .push(WebhookCall { url: url.to_string(), payload: payload.clone() });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWebhookAdapter, WebhookCall};

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
