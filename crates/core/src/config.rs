// SPDX-License-Identifier: MIT

//! Layered, immutable run configuration.
//!
//! Configuration is assembled once before supervision starts: defaults, then
//! `/etc/pingback.conf`, then `~/.pingback.conf`, then command-line overrides.
//! Unreadable files are skipped; malformed JSON is a hard error naming the
//! offending path. After assembly the configuration is read-only for the
//! process lifetime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::gravatar::gravatar_url;

/// Default number of lines kept per stream buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 5;

/// Default embed accent color.
pub const DEFAULT_COLOR: u32 = 0x2176C7;

const ASSET_BASE: &str = "https://raw.githubusercontent.com/pingback-sh/pingback/main/assets";
const PROJECT_URL: &str = "https://github.com/pingback-sh/pingback";

/// Errors raised while assembling or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no webhook configured; pass --webhook or set one in a config file")]
    MissingWebhook,

    #[error("invalid webhook `{url}`: expected an http(s) URL")]
    InvalidWebhook { url: String },

    #[error("invalid config at {}: {message}", path.display())]
    InvalidFile { path: PathBuf, message: String },
}

/// One layer of configuration as read from a JSON config file. Every field is
/// optional; later layers override earlier ones field by field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub webhook: Option<String>,
    pub simple: Option<bool>,
    pub color: Option<u32>,
    pub title_url: Option<String>,
    pub image: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_icon: Option<String>,
    pub user_url: Option<String>,
    pub footer: Option<String>,
    pub footer_icon: Option<String>,
    pub icon_success: Option<String>,
    pub icon_failure: Option<String>,
    pub icon_warning: Option<String>,
    pub icon_period: Option<String>,
    pub icon_timeout: Option<String>,
    /// Periodic report interval in seconds.
    pub periodic: Option<u64>,
    /// Kill-after timeout in seconds.
    pub timeout: Option<u64>,
    pub buffer_size: Option<usize>,
}

impl ConfigFile {
    /// Read one config layer. A missing or unreadable file yields `None`;
    /// unparseable JSON is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Ok(None);
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| ConfigError::InvalidFile {
                path: path.to_path_buf(),
                message: err.to_string(),
            })
    }

    /// Standard layer paths, lowest precedence first.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/pingback.conf")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".pingback.conf"));
        }
        paths
    }
}

/// Immutable run configuration consumed by the supervisor and emitter.
#[derive(Debug, Clone)]
pub struct Config {
    /// Webhook endpoint; required before supervision starts.
    pub webhook: Option<String>,
    /// Send a plain-text message instead of a rich embed.
    pub simple: bool,
    pub color: u32,
    pub title_url: Option<String>,
    pub image: Option<String>,
    pub user_name: String,
    pub user_email: Option<String>,
    pub user_icon: Option<String>,
    pub user_url: Option<String>,
    pub footer: Option<String>,
    pub footer_icon: Option<String>,
    pub icon_success: String,
    pub icon_failure: String,
    pub icon_warning: String,
    pub icon_period: String,
    pub icon_timeout: String,
    /// Interval between periodic heartbeat reports; disabled when unset.
    pub period: Option<Duration>,
    /// Deadline after which the child is terminated; disabled when unset.
    pub timeout: Option<Duration>,
    /// Ring buffer capacity per stream, in lines.
    pub buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        let (user, host) = crate::record::local_identity();
        Self {
            webhook: None,
            simple: false,
            color: DEFAULT_COLOR,
            title_url: None,
            image: None,
            user_name: "Pingback User".to_string(),
            user_email: Some(format!("{user}@{host}")),
            user_icon: None,
            user_url: Some(PROJECT_URL.to_string()),
            footer: Some(format!("via {user}@{host}")),
            footer_icon: Some(format!("{ASSET_BASE}/Icon.png")),
            icon_success: format!("{ASSET_BASE}/Success.png"),
            icon_failure: format!("{ASSET_BASE}/Failure.png"),
            icon_warning: format!("{ASSET_BASE}/Warning.png"),
            icon_period: format!("{ASSET_BASE}/Period.png"),
            icon_timeout: format!("{ASSET_BASE}/Timeout.png"),
            period: None,
            timeout: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Assemble configuration from the standard file layers.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&ConfigFile::default_paths())
    }

    /// Assemble configuration from explicit file layers (lowest precedence
    /// first). Used directly by tests.
    pub fn load_from(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for path in paths {
            if let Some(layer) = ConfigFile::load(path)? {
                config.apply(layer);
            }
        }
        Ok(config)
    }

    /// Overlay one configuration layer, field by field.
    pub fn apply(&mut self, layer: ConfigFile) {
        let ConfigFile {
            webhook,
            simple,
            color,
            title_url,
            image,
            user_name,
            user_email,
            user_icon,
            user_url,
            footer,
            footer_icon,
            icon_success,
            icon_failure,
            icon_warning,
            icon_period,
            icon_timeout,
            periodic,
            timeout,
            buffer_size,
        } = layer;

        if webhook.is_some() {
            self.webhook = webhook;
        }
        if let Some(simple) = simple {
            self.simple = simple;
        }
        if let Some(color) = color {
            self.color = color;
        }
        if title_url.is_some() {
            self.title_url = title_url;
        }
        if image.is_some() {
            self.image = image;
        }
        if let Some(user_name) = user_name {
            self.user_name = user_name;
        }
        if user_email.is_some() {
            self.user_email = user_email;
        }
        if user_icon.is_some() {
            self.user_icon = user_icon;
        }
        if user_url.is_some() {
            self.user_url = user_url;
        }
        if footer.is_some() {
            self.footer = footer;
        }
        if footer_icon.is_some() {
            self.footer_icon = footer_icon;
        }
        if let Some(icon) = icon_success {
            self.icon_success = icon;
        }
        if let Some(icon) = icon_failure {
            self.icon_failure = icon;
        }
        if let Some(icon) = icon_warning {
            self.icon_warning = icon;
        }
        if let Some(icon) = icon_period {
            self.icon_period = icon;
        }
        if let Some(icon) = icon_timeout {
            self.icon_timeout = icon;
        }
        if let Some(secs) = periodic {
            self.period = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = timeout {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(size) = buffer_size {
            self.buffer_size = size;
        }
    }

    /// Fill in the author icon from the email address when no icon was
    /// configured explicitly.
    pub fn derive_user_icon(&mut self) {
        if self.user_icon.is_none() {
            if let Some(ref email) = self.user_email {
                self.user_icon = Some(gravatar_url(email));
            }
        }
    }

    /// Fail fast on configuration the emitter cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.webhook.as_deref() {
            None => Err(ConfigError::MissingWebhook),
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
            Some(url) => Err(ConfigError::InvalidWebhook { url: url.to_string() }),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
