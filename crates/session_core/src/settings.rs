use std::{collections::HashMap, fs, path::Path, time::Duration};

use url::Url;

use crate::error::SessionError;

pub const DEFAULT_LOGIN_PATH: &str = "/auth";
pub const DEFAULT_AVATAR_PATH: &str = "/static/images/default-avatar.png";
const DEFAULT_ORIGIN: &str = "http://127.0.0.1:5000";
const DEFAULT_CLIENT_WAIT: Duration = Duration::from_secs(5);
const DEFAULT_MODAL_OPEN_DELAY: Duration = Duration::from_millis(10);
const DEFAULT_MODAL_CLOSE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Same-origin server that serves the auth config and logout endpoints.
    pub origin: Url,
    pub login_path: String,
    pub default_avatar: String,
    /// Upper bound on the config fetch performed while building the client.
    pub client_wait: Duration,
    pub modal_open_delay: Duration,
    pub modal_close_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid url"),
            login_path: DEFAULT_LOGIN_PATH.into(),
            default_avatar: DEFAULT_AVATAR_PATH.into(),
            client_wait: DEFAULT_CLIENT_WAIT,
            modal_open_delay: DEFAULT_MODAL_OPEN_DELAY,
            modal_close_delay: DEFAULT_MODAL_CLOSE_DELAY,
        }
    }
}

impl ControllerSettings {
    pub fn with_origin(origin: &str) -> Result<Self, SessionError> {
        Ok(Self {
            origin: parse_origin(origin)?,
            ..Self::default()
        })
    }
}

/// Defaults, then `session.toml` in the working directory, then environment.
pub fn load_settings() -> Result<ControllerSettings, SessionError> {
    load_settings_from(Path::new("session.toml"))
}

pub fn load_settings_from(path: &Path) -> Result<ControllerSettings, SessionError> {
    let mut settings = ControllerSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw).map_err(|err| {
            SessionError::InvalidSettings(format!("{}: {err}", path.display()))
        })?;
        apply_file_settings(&mut settings, &file_cfg)?;
    }

    if let Ok(v) = std::env::var("APP__ORIGIN") {
        settings.origin = parse_origin(&v)?;
    }
    if let Ok(v) = std::env::var("APP__LOGIN_PATH") {
        settings.login_path = v;
    }
    if let Ok(v) = std::env::var("APP__DEFAULT_AVATAR") {
        settings.default_avatar = v;
    }
    if let Ok(v) = std::env::var("APP__CLIENT_WAIT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.client_wait = Duration::from_millis(parsed);
        }
    }

    Ok(settings)
}

fn apply_file_settings(
    settings: &mut ControllerSettings,
    file_cfg: &HashMap<String, toml::Value>,
) -> Result<(), SessionError> {
    if let Some(v) = file_cfg.get("origin").and_then(toml::Value::as_str) {
        settings.origin = parse_origin(v)?;
    }
    if let Some(v) = file_cfg.get("login_path").and_then(toml::Value::as_str) {
        settings.login_path = v.to_string();
    }
    if let Some(v) = file_cfg.get("default_avatar").and_then(toml::Value::as_str) {
        settings.default_avatar = v.to_string();
    }
    if let Some(v) = millis(file_cfg, "client_wait_ms") {
        settings.client_wait = v;
    }
    if let Some(v) = millis(file_cfg, "modal_open_delay_ms") {
        settings.modal_open_delay = v;
    }
    if let Some(v) = millis(file_cfg, "modal_close_delay_ms") {
        settings.modal_close_delay = v;
    }
    Ok(())
}

fn millis(file_cfg: &HashMap<String, toml::Value>, key: &str) -> Option<Duration> {
    file_cfg
        .get(key)
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
        .map(Duration::from_millis)
}

fn parse_origin(raw: &str) -> Result<Url, SessionError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| SessionError::InvalidSettings(format!("origin '{raw}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(SessionError::InvalidSettings(format!(
            "origin '{raw}' cannot be used as a base url"
        )));
    }
    Ok(url)
}
