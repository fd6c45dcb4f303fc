//! Detector configuration.
//!
//! The configuration is process-wide but mutable at runtime: the monitor
//! swaps it wholesale on update, and each detection cycle takes a snapshot
//! before issuing any request.

use crate::result::{RelayscopeError, RelayscopeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// History capacity used when the configured value is 0.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Environment variable holding the endpoint URL.
pub const ENDPOINT_ENV: &str = "OPENAI_ENDPOINT";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration of a detector.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// Full URL of the chat-completion endpoint
    pub endpoint: String,
    /// Bearer credential
    #[serde(alias = "api_key")]
    pub api_key: String,
    /// Model identifier sent with every probe
    pub model: String,
    /// Cadence in minutes, 0 disables periodic detection
    #[serde(alias = "interval", alias = "interval_minutes")]
    pub interval_minutes: u32,
    /// Number of results retained
    #[serde(alias = "max_history")]
    pub max_history: usize,
    /// Keep the last raw response body on each result
    #[serde(alias = "save_raw_response", alias = "save_raw_resp")]
    pub save_raw_response: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            interval_minutes: 0,
            max_history: DEFAULT_MAX_HISTORY,
            save_raw_response: true,
        }
    }
}

impl fmt::Debug for DetectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("interval_minutes", &self.interval_minutes)
            .field("max_history", &self.max_history)
            .field("save_raw_response", &self.save_raw_response)
            .finish()
    }
}

impl DetectorConfig {
    /// Create a configuration for the given endpoint and key
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the cadence in minutes
    #[must_use]
    pub const fn with_interval_minutes(mut self, minutes: u32) -> Self {
        self.interval_minutes = minutes;
        self
    }

    /// Set the history capacity
    #[must_use]
    pub const fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Enable or disable raw response retention
    #[must_use]
    pub const fn with_save_raw_response(mut self, save: bool) -> Self {
        self.save_raw_response = save;
        self
    }

    /// Return a copy with defaults substituted for out-of-range values.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.max_history == 0 {
            self.max_history = DEFAULT_MAX_HISTORY;
        }
        if self.model.trim().is_empty() {
            self.model = DEFAULT_MODEL.to_string();
        }
        self
    }

    /// Check that the configuration can drive a detection cycle.
    pub fn validate(&self) -> RelayscopeResult<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(RelayscopeError::invalid_config(format!(
                "endpoint is required (flag --endpoint or {ENDPOINT_ENV})"
            )));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(RelayscopeError::invalid_config(format!(
                "endpoint must be an http(s) URL, got {endpoint:?}"
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(RelayscopeError::invalid_config(format!(
                "API key is required (flag --api-key or {API_KEY_ENV})"
            )));
        }
        Ok(())
    }

    /// Load a configuration file. YAML is a superset of JSON, so both work.
    pub fn from_file(path: impl AsRef<Path>) -> RelayscopeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse a YAML or JSON document.
    pub fn from_yaml_str(content: &str) -> RelayscopeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }
}
