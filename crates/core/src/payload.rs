// SPDX-License-Identifier: MIT

//! Notification payload rendering.
//!
//! Two mutually exclusive renderings, selected once by the configuration
//! flag: a plain-text message (`{"content": ...}`) or a rich embed document.
//! Per-event differences (icon, title, verb) are table-driven on
//! [`EventKind`]; field population is shared.

use serde::Serialize;

use crate::config::Config;
use crate::record::{ExecutionRecord, Mode};

/// Lifecycle event a notification reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Normal completion.
    Final,
    /// Periodic heartbeat while the run is live.
    Periodic,
    /// Forced report requested via external signal.
    Signal,
    /// The configured deadline expired and the child was terminated.
    Timeout,
    /// The supervisor itself was interrupted.
    Interrupt,
}

impl EventKind {
    /// Terminal events carry the exit code and end time; live updates do not.
    fn is_terminal(self) -> bool {
        matches!(self, EventKind::Final | EventKind::Timeout | EventKind::Interrupt)
    }

    fn emoticon(self, success: bool) -> &'static str {
        match self {
            EventKind::Final if success => ":white_check_mark:",
            EventKind::Final => ":x:",
            EventKind::Periodic => ":arrows_counterclockwise:",
            EventKind::Signal => ":pushpin:",
            EventKind::Timeout => ":clock4:",
            EventKind::Interrupt => ":octagonal_sign:",
        }
    }
}

/// Render a payload document, or `None` when no content was populated; an
/// empty document must never be delivered.
pub fn render(kind: EventKind, config: &Config, record: &ExecutionRecord) -> Option<serde_json::Value> {
    let doc = if config.simple {
        serde_json::to_value(Message::compose(kind, record))
    } else {
        serde_json::to_value(EmbedDoc { embeds: vec![Embed::compose(kind, config, record)] })
    };
    doc.ok().filter(|doc| !is_empty_document(doc))
}

fn is_empty_document(doc: &serde_json::Value) -> bool {
    if let Some(content) = doc.get("content") {
        return content.as_str().is_none_or(str::is_empty);
    }
    match doc.get("embeds").and_then(|e| e.as_array()).and_then(|e| e.first()) {
        Some(embed) => {
            let no_description = embed
                .get("description")
                .and_then(|d| d.as_str())
                .is_none_or(str::is_empty);
            let no_fields = embed
                .get("fields")
                .and_then(|f| f.as_array())
                .is_none_or(|f| f.is_empty());
            no_description && no_fields
        }
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Simple mode
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Message {
    content: String,
}

impl Message {
    fn compose(kind: EventKind, record: &ExecutionRecord) -> Self {
        let emoticon = kind.emoticon(record.success());
        let command = record.command_display();
        let hostname = &record.hostname;
        let username = &record.username;
        let runtime = record.runtime_display();

        let content = match kind {
            EventKind::Final => format!(
                "{emoticon} Your `{command}` command on `{hostname}` started by `{username}` just finished after {runtime}."
            ),
            EventKind::Periodic => format!(
                "{emoticon} Periodic update on your `{command}` command on `{hostname}` started by `{username}` is running for {runtime}."
            ),
            EventKind::Signal => format!(
                "{emoticon} Forced update on your `{command}` command on `{hostname}` started by `{username}` is running for {runtime}."
            ),
            EventKind::Timeout => format!(
                "{emoticon} Your `{command}` command on `{hostname}` started by `{username}` just timed out after {runtime}."
            ),
            EventKind::Interrupt => format!(
                "{emoticon} Your `{command}` command on `{hostname}` started by `{username}` was just interrupted after {runtime}."
            ),
        };
        Self { content }
    }
}

// ---------------------------------------------------------------------------
// Embed mode
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbedDoc {
    embeds: Vec<Embed>,
}

#[derive(Debug, Default, Serialize)]
struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    color: u32,
    author: EmbedAuthor,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter>,
    timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
}

#[derive(Debug, Default, Serialize)]
struct EmbedAuthor {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedMedia {
    url: String,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

impl Embed {
    fn compose(kind: EventKind, config: &Config, record: &ExecutionRecord) -> Self {
        let mut embed = Self::base(config, record);
        embed.thumbnail = Some(EmbedMedia { url: thumbnail_icon(kind, config, record) });
        embed.title = Some(title(kind, record));
        embed.description = description(kind, record);
        embed.fields = fields(kind, record);
        embed
    }

    /// Shared scaffolding: color, author block, optional title link, image,
    /// footer and snapshot timestamp.
    fn base(config: &Config, record: &ExecutionRecord) -> Self {
        Self {
            color: config.color,
            author: EmbedAuthor {
                name: config.user_name.clone(),
                icon_url: config.user_icon.clone(),
                url: config.user_url.clone(),
            },
            url: config.title_url.clone(),
            image: config.image.clone().map(|url| EmbedMedia { url }),
            footer: config.footer.clone().map(|text| EmbedFooter {
                text,
                icon_url: config.footer_icon.clone(),
            }),
            timestamp: record.timestamp(),
            ..Self::default()
        }
    }
}

fn thumbnail_icon(kind: EventKind, config: &Config, record: &ExecutionRecord) -> String {
    match kind {
        EventKind::Final if record.success() => config.icon_success.clone(),
        EventKind::Final => config.icon_failure.clone(),
        EventKind::Periodic => config.icon_period.clone(),
        EventKind::Signal => config.icon_warning.clone(),
        EventKind::Timeout | EventKind::Interrupt => config.icon_timeout.clone(),
    }
}

fn title(kind: EventKind, record: &ExecutionRecord) -> String {
    let command = record.command_display();
    match kind {
        EventKind::Final => format!("**CMD:** `{command}`"),
        EventKind::Periodic => format!("Periodic update on `[{}] {command}`", record.pid),
        EventKind::Signal => format!("Forced update on `[{}] {command}`", record.pid),
        EventKind::Timeout => format!("**Timed out CMD:** `{command}`"),
        EventKind::Interrupt => format!("**Interrupted CMD:** `{command}`"),
    }
}

/// Argument listing (terminal events, wrapper mode only) followed by the
/// captured stream excerpts in fenced code blocks.
fn description(kind: EventKind, record: &ExecutionRecord) -> Option<String> {
    let mut desc = String::new();

    if kind.is_terminal() && record.mode != Mode::Sink && !record.arguments.is_empty() {
        desc.push_str("**Arguments:**\n```\n");
        for arg in &record.arguments {
            desc.push('[');
            desc.push_str(arg);
            desc.push_str("]\n");
        }
        desc.push_str("```\n");
    }

    for (label, buffer) in [
        ("STDIN", &record.stdin_buffer),
        ("STDOUT", &record.stdout_buffer),
        ("STDERR", &record.stderr_buffer),
    ] {
        if !buffer.is_empty() {
            if !desc.is_empty() {
                desc.push('\n');
            }
            desc.push_str(&format!("**{label} buffer:**\n```\n{buffer}\n```"));
        }
    }

    (!desc.is_empty()).then_some(desc)
}

fn fields(kind: EventKind, record: &ExecutionRecord) -> Vec<EmbedField> {
    let mut fields = Vec::new();
    let mut push = |name: &str, value: String| {
        fields.push(EmbedField { name: name.to_string(), value, inline: true });
    };

    if kind.is_terminal() {
        push("Return Code", record.returncode_display());
    }
    push("Run time", record.runtime_display());
    push("Start time", record.start_display());
    if kind.is_terminal() {
        push("End time", record.end_display());
    }
    push("STDIN", format!("{} lines", record.stdin_lines));
    push("STDOUT", format!("{} lines", record.stdout_lines));
    push("STDERR", format!("{} lines", record.stderr_lines));
    fields
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
