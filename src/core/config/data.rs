use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for one configured provider. Immutable for the
/// lifetime of the adapter built from it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

/// Outbound proxy settings, applied to every request when enabled.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub http: Option<String>,
    #[serde(default)]
    pub https: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub default_model: String,
    pub models: HashMap<String, ModelConfig>,
    pub proxy: ProxyConfig,
    pub max_history: usize,
    pub stream_output: bool,
    /// Interface language override (e.g. "en", "zh"); the system locale is
    /// used when unset.
    pub language: Option<String>,
    /// Bound on non-streaming requests and on connecting for streamed ones.
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Look up a provider entry, case-insensitively, returning the
    /// configured key alongside it.
    pub fn model_config(&self, name: &str) -> Option<(&str, &ModelConfig)> {
        self.models
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, config)| (key.as_str(), config))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
