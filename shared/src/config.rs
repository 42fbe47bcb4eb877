use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{ValidatedUrl, MAX_TIMEOUT_MS};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_EDIT_TIMEOUT_MS: u64 = 120_000;

/// Credential lookup order.
pub const API_KEY_ENV_VARS: &[&str] = &["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no API key found (set one of: {})", API_KEY_ENV_VARS.join(", "))]
    MissingApiKey,

    #[error("invalid API base URL: {0}")]
    InvalidApiBase(String),

    #[error("model name cannot be empty")]
    EmptyModel,

    #[error("timeout must be between 1 and {max}ms, got {value}")]
    InvalidTimeout { value: u64, max: u64 },
}

#[derive(Clone)]
pub struct EditorConfig {
    pub api_base: String,
    pub model: String,
    pub timeout_ms: u64,
    api_key: SecretString,
}

impl EditorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_ms: DEFAULT_EDIT_TIMEOUT_MS,
            api_key: SecretString::new(api_key.into().trim().to_string()),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|key| !key.trim().is_empty())
            .map(Self::new)
            .ok_or(ConfigError::MissingApiKey)
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Overwrites every field the update carries.
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(api_key) = update.api_key {
            self.api_key = SecretString::new(api_key.trim().to_string());
        }
        if let Some(api_base) = update.api_base {
            self.api_base = api_base.trim_end_matches('/').to_string();
        }
        if let Some(model) = update.model {
            self.model = model;
        }
        if let Some(timeout_ms) = update.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn edit_endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model.trim()
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::InvalidTimeout {
                value: self.timeout_ms,
                max: MAX_TIMEOUT_MS,
            });
        }
        ValidatedUrl::new(self.edit_endpoint())
            .map_err(|e| ConfigError::InvalidApiBase(e.to_string()))?;
        Ok(())
    }
}

/// Built-in endpoint settings with no credential; fails [`EditorConfig::validate`]
/// until a key is supplied.
impl Default for EditorConfig {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for EditorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorConfig")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Settings a shell hands to the core at startup.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl From<&EditorConfig> for ConfigUpdate {
    fn from(config: &EditorConfig) -> Self {
        Self {
            api_key: Some(config.api_key().to_string()),
            api_base: Some(config.api_base.clone()),
            model: Some(config.model.clone()),
            timeout_ms: Some(config.timeout_ms),
        }
    }
}

impl fmt::Debug for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigUpdate")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
