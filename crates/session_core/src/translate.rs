//! Translation lookup used for user-facing labels.
//!
//! Lookups never fail: a missing key, or a catalog that has not loaded yet,
//! yields the literal fallback passed by the caller.

use std::{collections::HashMap, sync::OnceLock};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};

pub trait Translator: Send + Sync {
    fn t(&self, key: &str, fallback: &str) -> String;

    /// Fires with the active language whenever the catalog behind `t`
    /// changes. Translators with a fixed catalog return `None`.
    fn changes(&self) -> Option<watch::Receiver<Option<String>>> {
        None
    }
}

/// Returns every fallback unchanged.
pub struct Untranslated;

impl Translator for Untranslated {
    fn t(&self, _key: &str, fallback: &str) -> String {
        fallback.to_string()
    }
}

/// Flat key → string table built from i18next-style nested JSON resources.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("translation resource is not json")?;
        let mut entries = HashMap::new();
        flatten("", &value, &mut entries);
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        Value::String(text) if !prefix.is_empty() => {
            out.insert(prefix.to_string(), text.clone());
        }
        _ => {}
    }
}

impl Translator for Catalog {
    fn t(&self, key: &str, fallback: &str) -> String {
        self.get(key).unwrap_or(fallback).to_string()
    }
}

/// Translator whose catalog arrives after the controller starts.
pub struct LazyTranslator {
    catalog: OnceLock<Catalog>,
    language: watch::Sender<Option<String>>,
}

impl Default for LazyTranslator {
    fn default() -> Self {
        let (language, _) = watch::channel(None);
        Self {
            catalog: OnceLock::new(),
            language,
        }
    }
}

impl LazyTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the catalog. Only the first successful install is kept; a
    /// resource that fails to parse is logged and lookups keep falling back.
    pub fn install_json(&self, language: &str, raw: &str) -> bool {
        match Catalog::from_json_str(raw) {
            Ok(catalog) => {
                if self.catalog.set(catalog).is_err() {
                    return false;
                }
                info!(language, "translations installed");
                self.language.send_replace(Some(language.to_string()));
                true
            }
            Err(err) => {
                warn!(language, error = %err, "translations unavailable; using fallback text");
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.catalog.get().is_some()
    }

    pub fn language(&self) -> Option<String> {
        self.language.borrow().clone()
    }
}

impl Translator for LazyTranslator {
    fn t(&self, key: &str, fallback: &str) -> String {
        match self.catalog.get() {
            Some(catalog) => catalog.t(key, fallback),
            None => fallback.to_string(),
        }
    }

    fn changes(&self) -> Option<watch::Receiver<Option<String>>> {
        Some(self.language.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RU: &str = r#"{"nav":{"login":"Войти"},"profile":{"noEmail":"Нет email","count":3}}"#;

    #[test]
    fn nested_resources_resolve_by_dotted_key() {
        let catalog = Catalog::from_json_str(RU).expect("catalog");
        assert_eq!(catalog.t("nav.login", "Log in"), "Войти");
        assert_eq!(catalog.t("profile.noEmail", "No email"), "Нет email");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn unknown_key_uses_fallback() {
        let catalog = Catalog::from_json_str(RU).expect("catalog");
        assert_eq!(catalog.t("profile.count", "3 items"), "3 items");
        assert_eq!(catalog.t("nav.logout", "Log out"), "Log out");
    }

    #[test]
    fn lazy_translator_falls_back_until_installed() {
        let translator = LazyTranslator::new();
        assert_eq!(translator.t("nav.login", "Log in"), "Log in");

        assert!(!translator.install_json("ru", "{not json"));
        assert!(!translator.is_ready());
        assert_eq!(translator.t("nav.login", "Log in"), "Log in");

        assert!(translator.install_json("ru", RU));
        assert_eq!(translator.t("nav.login", "Log in"), "Войти");
        assert_eq!(translator.language().as_deref(), Some("ru"));

        assert!(!translator.install_json("en", r#"{"nav":{"login":"Sign in"}}"#));
        assert_eq!(translator.t("nav.login", "Log in"), "Войти");
    }

    #[test]
    fn install_marks_the_change_receiver() {
        let translator = LazyTranslator::new();
        let changes = translator.changes().expect("lazy translator reports changes");
        assert!(!changes.has_changed().expect("sender alive"));

        translator.install_json("ru", RU);
        assert!(changes.has_changed().expect("sender alive"));
        assert_eq!(changes.borrow().as_deref(), Some("ru"));
        assert!(Untranslated.changes().is_none());
    }
}
