use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_API_BASE: &str = "/api/v1";
pub const DEFAULT_CONFIG_FILE: &str = "taskflow.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub api_base: Option<String>,
    pub session_file: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            api_base: None,
            session_file: None,
            request_timeout_secs: 30,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn session_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        let base = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("unable to resolve user config dir"))?;
        Ok(base.join("taskflow").join("session.json"))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    api_base: Option<String>,
    session_file: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    log_filter: Option<String>,
}

/// Defaults, then `taskflow.toml` (or `path`), then environment overrides.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(file) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid settings file '{}'", file.display()))?;
            apply_file_settings(&mut settings, file_cfg);
        }
        Err(err) if path.is_some() => {
            return Err(err).with_context(|| {
                format!("failed to read settings file '{}'", file.display())
            });
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.api_base {
        settings.api_base = Some(v);
    }
    if let Some(v) = file_cfg.session_file {
        settings.session_file = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

pub(crate) fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let first = |keys: [&str; 2]| keys.into_iter().find_map(|key| lookup(key));

    if let Some(v) = first(["APP__SERVER_URL", "TASKFLOW_SERVER_URL"]) {
        settings.server_url = v;
    }
    if let Some(v) = first(["APP__API_BASE", "TASKFLOW_API_BASE"]) {
        settings.api_base = Some(v);
    }
    if let Some(v) = first(["APP__SESSION_FILE", "TASKFLOW_SESSION_FILE"]) {
        settings.session_file = Some(PathBuf::from(v));
    }
    if let Some(v) = first(["APP__REQUEST_TIMEOUT_SECS", "TASKFLOW_REQUEST_TIMEOUT_SECS"]) {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = first(["APP__LOG", "TASKFLOW_LOG"]) {
        settings.log_filter = v;
    }
}

/// Parameters carried by the URL the client was launched with
/// (`?token=...&apiBase=...`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pub token: Option<String>,
    pub api_base: Option<String>,
}

impl LaunchParams {
    pub fn from_url(raw: &str) -> anyhow::Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("invalid launch url '{raw}'"))?;
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "token" => params.token = Some(value.into_owned()),
                "apiBase" => params.api_base = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(params)
    }
}

/// Launch URL `apiBase`, then configured `api_base`, then `/api/v1`; relative
/// bases are joined onto `server_url`.
pub fn resolve_api_base(launch: &LaunchParams, settings: &Settings) -> anyhow::Result<String> {
    let base = launch
        .api_base
        .as_deref()
        .or(settings.api_base.as_deref())
        .unwrap_or(DEFAULT_API_BASE);

    let absolute = if base.contains("://") {
        Url::parse(base).with_context(|| format!("invalid api base '{base}'"))?
    } else {
        let server = Url::parse(&settings.server_url)
            .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
        server
            .join(base)
            .with_context(|| format!("cannot join api base '{base}' onto '{server}'"))?
    };

    Ok(absolute.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
