use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use shared::protocol::AuthConfig;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            supabase_url: None,
            supabase_key: None,
        }
    }
}

impl Settings {
    /// Client connection parameters, if both halves are configured.
    pub fn auth_config(&self) -> Option<AuthConfig> {
        let config = AuthConfig {
            supabase_url: self.supabase_url.clone()?.trim().to_string(),
            supabase_key: self.supabase_key.clone()?.trim().to_string(),
        };
        config.is_complete().then_some(config)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("server.toml"))
}

pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.server_bind = v.clone();
            }
            if let Some(v) = file_cfg.get("supabase_url") {
                settings.supabase_url = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("supabase_key") {
                settings.supabase_key = Some(v.clone());
            }
        }
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("SUPABASE_URL") {
        settings.supabase_url = Some(v);
    }
    if let Ok(v) = std::env::var("APP__SUPABASE_URL") {
        settings.supabase_url = Some(v);
    }

    if let Ok(v) = std::env::var("SUPABASE_KEY") {
        settings.supabase_key = Some(v);
    }
    if let Ok(v) = std::env::var("APP__SUPABASE_KEY") {
        settings.supabase_key = Some(v);
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
