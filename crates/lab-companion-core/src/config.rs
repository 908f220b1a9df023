//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_DATABASE: &str = "LAB_COMPANION_DB";
pub const ENV_MAX_UPLOAD_BYTES: &str = "LAB_COMPANION_MAX_UPLOAD_BYTES";
pub const ENV_FUZZY_THRESHOLD: &str = "LAB_COMPANION_FUZZY_THRESHOLD";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";

/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.95;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the hosted extraction model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub max_upload_bytes: u64,
    /// Fuzzy name matching is off while this is `None`
    pub fuzzy_threshold: Option<f64>,
    pub allowed_content_types: Vec<String>,
    pub gemini: GeminiSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("lab_companion.db"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            fuzzy_threshold: None,
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
                "application/pdf".to_string(),
            ],
            gemini: GeminiSettings::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Load from an optional file, apply the process environment, validate.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        let config = config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_MAX_UPLOAD_BYTES) {
            self.max_upload_bytes = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_MAX_UPLOAD_BYTES.to_string(),
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_FUZZY_THRESHOLD) {
            self.fuzzy_threshold = match raw.trim().to_lowercase().as_str() {
                "" | "off" | "none" => None,
                "on" => Some(DEFAULT_FUZZY_THRESHOLD),
                value => Some(value.parse().map_err(|_| ConfigError::InvalidEnv {
                    key: ENV_FUZZY_THRESHOLD.to_string(),
                    value: raw.clone(),
                })?),
            };
        }
        if let Some(key) = lookup(ENV_GEMINI_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = lookup(ENV_GEMINI_MODEL).filter(|m| !m.trim().is_empty()) {
            self.gemini.model = model;
        }
        Ok(self)
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_fuzzy_threshold(mut self, threshold: Option<f64>) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini.api_key = Some(key.into());
        self
    }

    pub fn is_allowed_content_type(&self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_lowercase();
        self.allowed_content_types.iter().any(|t| *t == content_type)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database path cannot be empty".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max upload size must be greater than 0".into()));
        }
        if let Some(threshold) = self.fuzzy_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::Invalid(
                    "fuzzy threshold must be between 0.0 and 1.0".into(),
                ));
            }
        }
        if self.allowed_content_types.is_empty() {
            return Err(ConfigError::Invalid("at least one content type must be allowed".into()));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(ConfigError::Invalid("Gemini model cannot be empty".into()));
        }
        if !self.gemini.base_url.starts_with("http://") && !self.gemini.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "Gemini base URL must start with http:// or https://".into(),
            ));
        }
        if self.gemini.timeout_secs == 0 {
            return Err(ConfigError::Invalid("Gemini timeout must be greater than 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_upload_bytes, 10_485_760);
        assert!(config.fuzzy_threshold.is_none());
        assert_eq!(config.gemini.model, "gemini-2.0-flash-exp");
        assert!(config.is_allowed_content_type("image/PNG"));
        assert!(!config.is_allowed_content_type("text/plain"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_database_path("/tmp/labs.db")
            .with_max_upload_bytes(1024)
            .with_fuzzy_threshold(None)
            .with_gemini_api_key("key");
        assert_eq!(config.database_path, PathBuf::from("/tmp/labs.db"));
        assert_eq!(config.max_upload_bytes, 1024);
        assert!(config.fuzzy_threshold.is_none());
        assert_eq!(config.gemini.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .apply_env(env(&[
                (ENV_DATABASE, "other.db"),
                (ENV_MAX_UPLOAD_BYTES, "2048"),
                (ENV_FUZZY_THRESHOLD, "off"),
                (ENV_GEMINI_MODEL, "gemini-1.5-pro"),
                (ENV_GEMINI_API_KEY, "  "),
            ]))
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("other.db"));
        assert_eq!(config.max_upload_bytes, 2048);
        assert!(config.fuzzy_threshold.is_none());
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_env_enables_fuzzy_matching() {
        let on = Config::default().apply_env(env(&[(ENV_FUZZY_THRESHOLD, "on")])).unwrap();
        assert_eq!(on.fuzzy_threshold, Some(DEFAULT_FUZZY_THRESHOLD));

        let custom = Config::default().apply_env(env(&[(ENV_FUZZY_THRESHOLD, "0.9")])).unwrap();
        assert_eq!(custom.fuzzy_threshold, Some(0.9));
    }

    #[test]
    fn test_bad_env_value() {
        let err = Config::default()
            .apply_env(env(&[(ENV_MAX_UPLOAD_BYTES, "ten")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_validation() {
        assert!(Config::default().with_max_upload_bytes(0).validate().is_err());
        assert!(Config::default().with_fuzzy_threshold(Some(1.5)).validate().is_err());
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.toml");
        std::fs::write(
            &path,
            "max_upload_bytes = 5000\n\n[gemini]\nmodel = \"gemini-1.5-flash\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_upload_bytes, 5000);
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.base_url, DEFAULT_GEMINI_BASE_URL);
        assert!(config.fuzzy_threshold.is_none());
    }
}
