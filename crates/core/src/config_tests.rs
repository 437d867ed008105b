// SPDX-License-Identifier: MIT

use std::io::Write;
use std::time::Duration;

use super::*;

fn write_layer(dir: &tempfile::TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(json.as_bytes()).unwrap();
    path
}

#[test]
fn defaults_are_sensible() {
    let config = Config::default();
    assert!(config.webhook.is_none());
    assert!(!config.simple);
    assert_eq!(config.color, DEFAULT_COLOR);
    assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    assert!(config.period.is_none());
    assert!(config.timeout.is_none());
    assert!(config.user_email.is_some());
    assert!(config.footer.as_deref().is_some_and(|f| f.starts_with("via ")));
}

#[test]
fn missing_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&[dir.path().join("absent.conf")]).unwrap();
    assert!(config.webhook.is_none());
}

#[test]
fn later_layers_override_earlier_ones() {
    let dir = tempfile::tempdir().unwrap();
    let global = write_layer(
        &dir,
        "global.conf",
        r#"{"webhook": "https://example.com/a", "color": 1, "periodic": 60}"#,
    );
    let local = write_layer(&dir, "local.conf", r#"{"webhook": "https://example.com/b"}"#);

    let config = Config::load_from(&[global, local]).unwrap();
    assert_eq!(config.webhook.as_deref(), Some("https://example.com/b"));
    // Fields absent from the later layer keep the earlier value.
    assert_eq!(config.color, 1);
    assert_eq!(config.period, Some(Duration::from_secs(60)));
}

#[test]
fn malformed_json_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write_layer(&dir, "bad.conf", "{not json");
    let err = Config::load_from(&[bad.clone()]).unwrap_err();
    match err {
        ConfigError::InvalidFile { path, .. } => assert_eq!(path, bad),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn durations_come_from_seconds() {
    let mut config = Config::default();
    config.apply(ConfigFile { periodic: Some(2), timeout: Some(30), ..Default::default() });
    assert_eq!(config.period, Some(Duration::from_secs(2)));
    assert_eq!(config.timeout, Some(Duration::from_secs(30)));
}

#[test]
fn derive_user_icon_uses_gravatar() {
    let mut config = Config::default();
    config.user_email = Some("test@example.com".to_string());
    config.user_icon = None;
    config.derive_user_icon();
    assert_eq!(
        config.user_icon.as_deref(),
        Some("https://www.gravatar.com/avatar/55502f40dc8b7c769880b10874abc9d0?s=128")
    );
}

#[test]
fn derive_user_icon_keeps_explicit_icon() {
    let mut config = Config::default();
    config.user_icon = Some("https://example.com/icon.png".to_string());
    config.derive_user_icon();
    assert_eq!(config.user_icon.as_deref(), Some("https://example.com/icon.png"));
}

#[test]
fn validate_requires_webhook() {
    let config = Config::default();
    assert!(matches!(config.validate(), Err(ConfigError::MissingWebhook)));
}

#[test]
fn validate_rejects_non_http_webhook() {
    let mut config = Config::default();
    config.webhook = Some("ftp://example.com/hook".to_string());
    assert!(matches!(config.validate(), Err(ConfigError::InvalidWebhook { .. })));
}

#[test]
fn validate_accepts_https_webhook() {
    let mut config = Config::default();
    config.webhook = Some("https://discord.com/api/webhooks/1/x".to_string());
    assert!(config.validate().is_ok());
}
