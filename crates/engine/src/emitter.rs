// SPDX-License-Identifier: MIT

//! Notification emission: payload construction plus one delivery attempt.

use std::sync::Arc;

use pingback_adapters::WebhookAdapter;
use pingback_core::{payload, Config, ConfigError, EventKind, ExecutionRecord};
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced to the emitter's caller. Delivery failures are not among
/// them: delivery is best-effort and only logged.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Builds one payload per lifecycle event and hands it to the webhook
/// adapter. One outbound attempt per call, never a retry.
#[derive(Clone)]
pub struct Emitter<W: WebhookAdapter> {
    config: Arc<Config>,
    webhook: W,
}

impl<W: WebhookAdapter> Emitter<W> {
    pub fn new(config: Arc<Config>, webhook: W) -> Self {
        Self { config, webhook }
    }

    /// Render and deliver one notification.
    ///
    /// A missing or invalid webhook is a configuration error and fails fast.
    /// An empty rendering is skipped with a local warning; a failed delivery
    /// is logged and swallowed.
    pub async fn emit(&self, kind: EventKind, record: &ExecutionRecord) -> Result<(), EmitError> {
        self.config.validate()?;
        let url = self.config.webhook.as_deref().ok_or(ConfigError::MissingWebhook)?;

        let Some(doc) = payload::render(kind, &self.config, record) else {
            warn!(?kind, "payload rendered empty; skipping delivery");
            return Ok(());
        };

        if let Err(err) = self.webhook.post(url, &doc).await {
            error!(?kind, %err, "webhook delivery failed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
