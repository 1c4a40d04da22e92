//! Seed configuration for the providers supported out of the box.

use std::collections::HashMap;

use super::data::{Config, ModelConfig, ProxyConfig};

pub(crate) const DEFAULT_MODEL: &str = "openai";
pub(crate) const DEFAULT_MAX_HISTORY: usize = 10;

fn builtin_models() -> HashMap<String, ModelConfig> {
    HashMap::from([
        (
            "openai".to_string(),
            ModelConfig {
                api_key: String::new(),
                model: "gpt-4o-mini".to_string(),
                api_base: "https://api.openai.com/v1".to_string(),
            },
        ),
        (
            "deepseek".to_string(),
            ModelConfig {
                api_key: String::new(),
                model: "deepseek-chat".to_string(),
                api_base: "https://api.deepseek.com/v1".to_string(),
            },
        ),
        (
            "qwen".to_string(),
            ModelConfig {
                api_key: String::new(),
                model: "qwen-max".to_string(),
                api_base: "https://dashscope.aliyuncs.com/api/v1".to_string(),
            },
        ),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            models: builtin_models(),
            proxy: ProxyConfig::default(),
            max_history: DEFAULT_MAX_HISTORY,
            stream_output: true,
            language: None,
            request_timeout_secs: None,
        }
    }
}
