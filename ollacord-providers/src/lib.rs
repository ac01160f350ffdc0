//! Inference backend clients for ollacord
//!
//! This crate provides the [`LLMProvider`] abstraction and the two wire
//! protocols ollacord speaks: Ollama's native chat API and the
//! OpenAI-compatible chat completions API.

pub mod base;
pub mod ollama;
pub mod openai;

pub use base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
pub use ollama::OllamaClient;
pub use openai::OpenAICompatClient;

use ollacord_core::config::ProviderConfig;
use std::sync::Arc;

/// Build the provider selected by `config.kind`
pub fn build_provider(config: &ProviderConfig) -> ProviderResult<Arc<dyn LLMProvider>> {
    let api_key = if config.api_key.trim().is_empty() {
        None
    } else {
        Some(config.api_key.clone())
    };

    match config.kind.as_str() {
        "ollama" => Ok(Arc::new(
            OllamaClient::new(config.api_base.clone(), config.model.clone())
                .with_api_key(api_key)
                .with_temperature(config.temperature),
        )),
        "openai" => Ok(Arc::new(
            OpenAICompatClient::new(config.api_base.clone(), config.model.clone())
                .with_api_key(api_key)
                .with_temperature(config.temperature),
        )),
        other => Err(ProviderError::ConfigError(format!(
            "Unknown provider kind: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_provider_by_kind() {
        let mut config = ProviderConfig::default();
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.get_default_model(), "qwen2.5:1.5b");

        config.kind = "openai".to_string();
        config.model = "gpt-4o-mini".to_string();
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.get_default_model(), "gpt-4o-mini");

        config.kind = "bedrock".to_string();
        assert!(matches!(
            build_provider(&config),
            Err(ProviderError::ConfigError(_))
        ));
    }
}
