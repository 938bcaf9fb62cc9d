//! Layered sidecar configuration.
//!
//! 1. **Compiled defaults**: [`SidecarSettings::default()`]
//! 2. **Settings file**: JSON, deep-merged over defaults
//! 3. **Environment**: `ORBIT_OLLAMA_URL`, `ORBIT_MODEL`, `ORBIT_LOG_LEVEL` (highest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;

use orbit_core::state::DEFAULT_MODEL;
use orbit_llm::ollama::{OllamaConfig, DEFAULT_BASE_URL};

pub const ENV_OLLAMA_URL: &str = "ORBIT_OLLAMA_URL";
pub const ENV_MODEL: &str = "ORBIT_MODEL";
pub const ENV_LOG_LEVEL: &str = "ORBIT_LOG_LEVEL";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SidecarSettings {
    /// Model selected until the backend's model list says otherwise.
    pub model: String,
    pub backend: BackendSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Page text budget, in characters, forwarded with each chat request.
    pub max_page_chars: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for SidecarSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            backend: BackendSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 120_000,
            max_page_chars: orbit_llm::converter::DEFAULT_MAX_PAGE_CHARS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SidecarSettings {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Deep-merge a JSON settings file over the defaults. No environment overrides.
    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SettingsError> {
        let overlay: Value = serde_json::from_str(raw)?;
        let defaults = serde_json::to_value(Self::default())?;
        Ok(serde_json::from_value(deep_merge(defaults, overlay))?)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_OLLAMA_URL).filter(|v| !v.is_empty()) {
            self.backend.base_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.is_empty()) {
            self.model = model;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }

    /// Client configuration for the configured backend. An unparseable URL falls back to the
    /// default.
    pub fn ollama_config(&self) -> OllamaConfig {
        let defaults = OllamaConfig::default();
        let base_url = match Url::parse(&self.backend.base_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    base_url = %self.backend.base_url,
                    error = %e,
                    "invalid backend url, using default"
                );
                defaults.base_url.clone()
            }
        };
        OllamaConfig {
            base_url,
            connect_timeout: Duration::from_millis(self.backend.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.backend.request_timeout_ms),
            max_page_chars: self.backend.max_page_chars,
        }
    }
}

/// Recursively merge `overlay` into `base`. Objects merge key by key; anything else replaces.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}
