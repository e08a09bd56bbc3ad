use crate::llm_provider::*;
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use anyhow::{anyhow, Result};
use archgraph_core::LLMConfig;
use std::sync::Arc;

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
        if !config.enabled {
            return Err(anyhow!("LLM is not enabled in configuration"));
        }

        let provider_name = config.provider.to_lowercase();
        let compat_config = match provider_name.as_str() {
            "openai" => Self::openai_config(config)?,
            "lmstudio" => OpenAICompatibleConfig::lm_studio(Self::model_or(config, "local-model")),
            "ollama" => OpenAICompatibleConfig::ollama(Self::model_or(config, "qwen2.5-coder:14b")),
            "openai-compatible" => Self::custom_config(config)?,
            _ => {
                return Err(anyhow!(
                    "Unsupported LLM provider: {}. Available providers: {}",
                    provider_name,
                    Self::supported_providers().join(", ")
                ))
            }
        };

        let compat_config = Self::apply_shared_settings(compat_config, config);
        tracing::info!(
            provider = %compat_config.provider_name,
            model = %compat_config.model,
            base_url = %compat_config.base_url,
            "Created LLM provider"
        );
        Ok(Arc::new(OpenAICompatibleProvider::new(compat_config)?))
    }

    fn model_or(config: &LLMConfig, fallback: &str) -> String {
        config
            .model
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    fn openai_config(config: &LLMConfig) -> Result<OpenAICompatibleConfig> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                anyhow!(
                    "OpenAI API key not found. Set 'api_key' in config \
                     or OPENAI_API_KEY environment variable"
                )
            })?;
        Ok(OpenAICompatibleConfig::openai(
            Self::model_or(config, "gpt-4o-mini"),
            Some(api_key),
        ))
    }

    fn custom_config(config: &LLMConfig) -> Result<OpenAICompatibleConfig> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            anyhow!("OpenAI-compatible base URL not found. Set 'base_url' in config")
        })?;
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("Model name is required for OpenAI-compatible provider"))?;
        let mut compat = OpenAICompatibleConfig::custom(base_url, model, "openai-compatible".into());
        compat.api_key = config.api_key.clone();
        Ok(compat)
    }

    fn apply_shared_settings(
        mut compat: OpenAICompatibleConfig,
        config: &LLMConfig,
    ) -> OpenAICompatibleConfig {
        if let Some(base_url) = &config.base_url {
            compat.base_url = base_url.clone();
        }
        if compat.api_key.is_none() {
            compat.api_key = config.api_key.clone();
        }
        compat.context_window = config.context_window;
        compat.max_tokens = config.max_tokens;
        compat.timeout_secs = config.timeout_secs;
        compat.max_retries = config.max_retries;
        compat
    }

    /// Check if any LLM provider is available
    pub async fn check_availability(provider: &Arc<dyn LLMProvider>) -> bool {
        provider.is_available().await
    }

    pub fn supported_providers() -> Vec<&'static str> {
        vec!["openai", "ollama", "lmstudio", "openai-compatible"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_providers() {
        let providers = LLMProviderFactory::supported_providers();
        assert!(providers.contains(&"ollama"));
        assert!(providers.contains(&"openai-compatible"));
    }

    #[test]
    fn test_ollama_provider_creation() {
        let config = LLMConfig {
            enabled: true,
            provider: "ollama".to_string(),
            model: Some("qwen2.5-coder:14b".to_string()),
            ..Default::default()
        };

        let provider = LLMProviderFactory::create_from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "qwen2.5-coder:14b");
    }

    #[test]
    fn test_compatible_provider_requires_base_url() {
        let config = LLMConfig {
            enabled: true,
            provider: "openai-compatible".to_string(),
            model: Some("m".to_string()),
            ..Default::default()
        };
        let err = LLMProviderFactory::create_from_config(&config)
            .err()
            .unwrap();
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let config = LLMConfig {
            enabled: true,
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        let err = LLMProviderFactory::create_from_config(&config)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unsupported LLM provider"));
    }

    #[test]
    fn test_disabled_llm() {
        let config = LLMConfig {
            enabled: false,
            ..Default::default()
        };

        let result = LLMProviderFactory::create_from_config(&config);
        assert!(result.is_err());
        assert!(result
            .err()
            .unwrap()
            .to_string()
            .contains("LLM is not enabled"));
    }
}
