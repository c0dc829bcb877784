//! Client settings: backend URL, request timeout, and default page size.

use std::fs;

use serde::Deserialize;

use crate::view::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub page_size: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 10,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Defaults, then `client.toml`, then environment.
pub fn load_settings() -> ClientSettings {
    let mut settings = match fs::read_to_string("client.toml") {
        Ok(raw) => settings_from_file(&raw),
        Err(_) => ClientSettings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn settings_from_file(raw: &str) -> ClientSettings {
    toml::from_str(raw).unwrap_or_else(|error| {
        tracing::warn!(%error, "ignoring malformed client.toml");
        ClientSettings::default()
    })
}

fn apply_env_overrides(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("STUDENTS_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = var("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.page_size = parsed.max(1);
        }
    }
}
