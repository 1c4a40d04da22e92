//! Provider resolution: from a configured name to a ready adapter.

use std::error::Error;
use std::fmt;

use crate::core::config::Config;
use crate::models::openai::OpenAiCompatModel;
use crate::models::qwen::QwenModel;
use crate::models::ChatModel;

#[derive(Debug)]
pub enum ProviderResolutionError {
    /// The name has no configuration entry, or names a family this build
    /// does not speak.
    UnknownProvider { provider: String },

    /// The stored key is empty and the environment fallback is unset.
    MissingApiKey { provider: String, env_var: String },

    /// The HTTP client (proxy settings included) could not be built.
    ClientBuild {
        provider: String,
        source: reqwest::Error,
    },
}

impl ProviderResolutionError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl fmt::Display for ProviderResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderResolutionError::UnknownProvider { provider } => {
                write!(
                    f,
                    "Unknown provider '{provider}'. Add a [models.{provider}] entry to the config file."
                )
            }
            ProviderResolutionError::MissingApiKey { provider, env_var } => {
                write!(
                    f,
                    "No API key for provider '{provider}'. Set it in the config file or export {env_var}."
                )
            }
            ProviderResolutionError::ClientBuild { provider, source } => {
                write!(
                    f,
                    "Could not build the HTTP client for provider '{provider}': {source}"
                )
            }
        }
    }
}

impl Error for ProviderResolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProviderResolutionError::ClientBuild { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Resolve a provider name to a configured adapter.
///
/// The stored entry is merged with the `{NAME}_API_KEY` environment
/// variable when its key is empty; dispatch to the adapter family is
/// case-insensitive. Reads environment variables, mutates nothing.
pub fn resolve_model(
    provider_name: &str,
    config: &Config,
) -> Result<Box<dyn ChatModel>, ProviderResolutionError> {
    let Some((canonical, model_config)) = config.model_config(provider_name) else {
        return Err(ProviderResolutionError::UnknownProvider {
            provider: provider_name.to_string(),
        });
    };
    let provider = canonical.to_string();

    let mut model_config = model_config.clone();
    if model_config.api_key.is_empty() {
        let env_var = format!("{}_API_KEY", provider.to_uppercase());
        match std::env::var(&env_var) {
            Ok(key) if !key.is_empty() => model_config.api_key = key,
            _ => {
                return Err(ProviderResolutionError::MissingApiKey { provider, env_var });
            }
        }
    }

    let timeout = config.request_timeout();
    let model: Box<dyn ChatModel> = match provider.to_ascii_lowercase().as_str() {
        "openai" | "deepseek" => Box::new(
            OpenAiCompatModel::new(&provider, &model_config, &config.proxy, timeout).map_err(
                |source| ProviderResolutionError::ClientBuild {
                    provider: provider.clone(),
                    source,
                },
            )?,
        ),
        "qwen" => Box::new(QwenModel::new(&model_config, &config.proxy, timeout).map_err(
            |source| ProviderResolutionError::ClientBuild {
                provider: provider.clone(),
                source,
            },
        )?),
        _ => return Err(ProviderResolutionError::UnknownProvider { provider }),
    };
    Ok(model)
}
