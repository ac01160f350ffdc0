//! Configuration validation rules.

use super::schema::{Config, DISCORD_MESSAGE_LIMIT};

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.relay.history_limit == 0 {
        errors.push("relay.history_limit must be > 0".to_string());
    }
    if config.relay.chunk_size == 0 || config.relay.chunk_size > DISCORD_MESSAGE_LIMIT {
        errors.push(format!(
            "relay.chunk_size must be in [1, {}]",
            DISCORD_MESSAGE_LIMIT
        ));
    }

    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.api_base.trim().is_empty() {
        errors.push("provider.api_base must not be empty".to_string());
    }
    if !matches!(config.provider.kind.as_str(), "ollama" | "openai") {
        errors.push(format!(
            "provider.kind must be one of [ollama, openai], got '{}'",
            config.provider.kind
        ));
    }
    if let Some(temperature) = config.provider.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
        }
    }

    if config.discord.gateway_url.trim().is_empty() {
        errors.push("discord.gateway_url must not be empty".to_string());
    }

    if !matches!(config.logging.format.to_lowercase().as_str(), "text" | "json") {
        errors.push(format!(
            "logging.format must be one of [text, json], got '{}'",
            config.logging.format
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Config(format!(
            "Invalid configuration:\n- {}",
            errors.join("\n- ")
        )))
    }
}
