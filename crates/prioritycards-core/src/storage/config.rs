//! TOML-based application configuration.
//!
//! Stores:
//! - Backend location and API key
//! - Table names for cards and credentials
//! - Authentication options
//! - Display preferences for the CLI
//!
//! Configuration is stored at `~/.config/prioritycards/config.toml`.
//! `PRIORITYCARDS_URL` and `PRIORITYCARDS_ANON_KEY` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;

pub const ENV_URL: &str = "PRIORITYCARDS_URL";
pub const ENV_ANON_KEY: &str = "PRIORITYCARDS_ANON_KEY";

/// Hosted backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: String,
    /// Public (anon) API key.
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default = "default_cards_table")]
    pub cards_table: String,
    #[serde(default = "default_credentials_table")]
    pub credentials_table: String,
    /// Per-request timeout. Unset means wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Send the SHA-256 hex digest of the password instead of the password.
    #[serde(default)]
    pub hash_passwords: bool,
    /// Key under which the session is persisted.
    #[serde(default = "default_session_key")]
    pub session_key: String,
}

/// CLI display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// `created` or `score`.
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/prioritycards/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Backend settings resolved from file and environment, ready for a client.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub url: String,
    pub anon_key: String,
    pub request_timeout: Option<Duration>,
}

// Default functions
fn default_cards_table() -> String {
    "cards".into()
}
fn default_credentials_table() -> String {
    "auth_users".into()
}
fn default_session_key() -> String {
    "auth".into()
}
fn default_sort() -> String {
    "created".into()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: None,
            cards_table: default_cards_table(),
            credentials_table: default_credentials_table(),
            request_timeout_secs: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            hash_passwords: false,
            session_key: default_session_key(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_sort: default_sort(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
        null_as_number: bool,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let unknown = || ConfigError::MissingKey(key.to_string());

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    // Optional fields serialize as null; the empty string clears them.
                    serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
                    serde_json::Value::Null => match value.parse::<u64>() {
                        Ok(n) if null_as_number => serde_json::Value::Number(n.into()),
                        _ => serde_json::Value::String(value.into()),
                    },
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot overwrite a section".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `~/.config/prioritycards/config.toml`
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        // An unset optional field has no type to go by: digits are tried as a
        // number first, then as text.
        let updated = match self.with_value(key, value, true) {
            Err(ConfigError::InvalidValue { .. }) if value.parse::<u64>().is_ok() => {
                self.with_value(key, value, false)?
            }
            other => other?,
        };
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn with_value(
        &self,
        key: &str,
        value: &str,
        null_as_number: bool,
    ) -> Result<Config, ConfigError> {
        let mut json =
            serde_json::to_value(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value, null_as_number)?;
        serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.display.default_sort.as_str() {
            "created" | "score" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "display.default_sort".into(),
                    message: format!("expected 'created' or 'score', got '{other}'"),
                })
            }
        }
        for (key, table) in [
            ("backend.cards_table", &self.backend.cards_table),
            ("backend.credentials_table", &self.backend.credentials_table),
        ] {
            if table.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "table name must not be empty".into(),
                });
            }
        }
        Ok(())
    }

    /// Resolve backend settings, letting the environment override the file.
    pub fn backend_settings(&self) -> Result<BackendSettings, ConfigError> {
        self.backend_settings_with(|name| std::env::var(name).ok())
    }

    fn backend_settings_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<BackendSettings, ConfigError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let url = non_empty(env(ENV_URL))
            .or_else(|| non_empty(Some(self.backend.url.clone())))
            .ok_or_else(|| ConfigError::MissingKey(format!("backend.url (or {ENV_URL})")))?;
        let anon_key = non_empty(env(ENV_ANON_KEY))
            .or_else(|| non_empty(self.backend.anon_key.clone()))
            .ok_or_else(|| {
                ConfigError::MissingKey(format!("backend.anon_key (or {ENV_ANON_KEY})"))
            })?;

        Ok(BackendSettings {
            url,
            anon_key,
            request_timeout: self.backend.request_timeout_secs.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.backend.cards_table, "cards");
        assert_eq!(parsed.backend.credentials_table, "auth_users");
        assert_eq!(parsed.auth.session_key, "auth");
        assert!(!parsed.auth.hash_passwords);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[backend]\nurl = \"https://x.test\"\n").unwrap();
        assert_eq!(parsed.backend.url, "https://x.test");
        assert_eq!(parsed.backend.cards_table, "cards");
        assert_eq!(parsed.display.default_sort, "created");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("auth.hash_passwords").as_deref(), Some("false"));
        assert_eq!(cfg.get("backend.cards_table").as_deref(), Some("cards"));
        assert_eq!(cfg.get("backend.anon_key").as_deref(), Some(""));
        assert!(cfg.get("backend.missing_key").is_none());
    }

    #[test]
    fn set_value_updates_nested_fields() {
        let mut cfg = Config::default();
        cfg.set_value("auth.hash_passwords", "true").unwrap();
        cfg.set_value("backend.anon_key", "anon-123").unwrap();
        cfg.set_value("backend.request_timeout_secs", "30").unwrap();
        assert!(cfg.auth.hash_passwords);
        assert_eq!(cfg.backend.anon_key.as_deref(), Some("anon-123"));
        assert_eq!(cfg.backend.request_timeout_secs, Some(30));

        cfg.set_value("backend.request_timeout_secs", "").unwrap();
        assert_eq!(cfg.backend.request_timeout_secs, None);
    }

    #[test]
    fn set_value_keeps_digit_only_strings_as_text() {
        let mut cfg = Config::default();
        cfg.set_value("backend.anon_key", "123456").unwrap();
        assert_eq!(cfg.backend.anon_key.as_deref(), Some("123456"));

        cfg.set_value("backend.request_timeout_secs", "45").unwrap();
        assert_eq!(cfg.backend.request_timeout_secs, Some(45));
        assert!(cfg.set_value("backend.request_timeout_secs", "soon").is_err());
        assert_eq!(cfg.backend.request_timeout_secs, Some(45));
    }

    #[test]
    fn set_value_rejects_unknown_key_and_bad_types() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("backend.nonexistent", "x"),
            Err(ConfigError::MissingKey(_))
        ));
        assert!(cfg.set_value("auth.hash_passwords", "maybe").is_err());
        assert!(cfg.set_value("backend", "x").is_err());
        assert!(cfg.set_value("display.default_sort", "alphabetical").is_err());
        assert_eq!(cfg.display.default_sort, "created");
    }

    #[test]
    fn backend_settings_require_url_and_key() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.backend_settings_with(|_| None),
            Err(ConfigError::MissingKey(_))
        ));

        let mut cfg = Config::default();
        cfg.backend.url = "https://file.test".into();
        cfg.backend.anon_key = Some("file-key".into());
        cfg.backend.request_timeout_secs = Some(5);
        let settings = cfg.backend_settings_with(|_| None).unwrap();
        assert_eq!(settings.url, "https://file.test");
        assert_eq!(settings.anon_key, "file-key");
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn environment_overrides_file() {
        let mut cfg = Config::default();
        cfg.backend.url = "https://file.test".into();
        cfg.backend.anon_key = Some("file-key".into());
        let settings = cfg
            .backend_settings_with(|name| match name {
                ENV_URL => Some("https://env.test".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(settings.url, "https://env.test");
        assert_eq!(settings.anon_key, "file-key");
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.backend.cards_table, "cards");

        let mut cfg = cfg;
        cfg.backend.url = "https://saved.test".into();
        cfg.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.backend.url, "https://saved.test");
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
