//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for ollacord
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Discord connection
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Inference backend
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Relay behavior
    #[serde(default)]
    pub relay: RelayConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// The Discord token, or a configuration error when it is missing.
    ///
    /// Without a token the platform connection must not be started.
    pub fn require_discord_token(&self) -> crate::Result<&str> {
        let token = self.discord.token.trim();
        if token.is_empty() {
            return Err(crate::Error::Config(
                "Discord token is not set (DISCORD_TOKEN or discord.token)".to_string(),
            ));
        }
        Ok(token)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Discord channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_discord_gateway")]
    pub gateway_url: String,
    #[serde(default = "default_discord_intents")]
    pub intents: u64,
    /// Show the typing indicator while a reply is generated
    #[serde(default = "default_true")]
    pub typing_indicator: bool,
}

fn default_discord_gateway() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

fn default_discord_intents() -> u64 {
    37377 // GUILDS + GUILD_MESSAGES + DIRECT_MESSAGES + MESSAGE_CONTENT
}

fn default_true() -> bool {
    true
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            gateway_url: default_discord_gateway(),
            intents: default_discord_intents(),
            typing_indicator: true,
        }
    }
}

/// Inference backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend protocol: "ollama" or "openai"
    #[serde(default = "default_provider_kind")]
    pub kind: String,
    /// Base URL of the backend
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token, only sent when non-empty
    #[serde(default)]
    pub api_key: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature; the backend default is used when unset
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_provider_kind() -> String {
    "ollama".to_string()
}

fn default_api_base() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen2.5:1.5b".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_base: default_api_base(),
            api_key: String::new(),
            model: default_model(),
            temperature: None,
        }
    }
}

/// Relay behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// System directive prepended to every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Turns kept per channel
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Maximum characters per outbound message
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Seconds to wait for the backend; 0 waits indefinitely
    #[serde(default)]
    pub inference_timeout_secs: u64,
    /// Text sent to the channel when the backend fails; empty sends nothing
    #[serde(default)]
    pub error_reply: String,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant".to_string()
}

fn default_history_limit() -> usize {
    crate::history::DEFAULT_HISTORY_LIMIT
}

fn default_chunk_size() -> usize {
    DISCORD_MESSAGE_LIMIT
}

/// Discord rejects messages longer than this many characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            history_limit: default_history_limit(),
            chunk_size: default_chunk_size(),
            inference_timeout_secs: 0,
            error_reply: String::new(),
        }
    }
}
