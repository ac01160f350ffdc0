//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Prefix for path-style environment overrides, e.g. `OLLACORD__RELAY__CHUNK_SIZE`
const ENV_PREFIX: &str = "OLLACORD__";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".ollacord"))
            .unwrap_or_else(|| PathBuf::from(".ollacord"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let mut config: Config = serde_json::from_value(merged)?;
        // Tokens pasted into files or .env often carry a trailing newline
        config.discord.token = config.discord.token.trim().to_string();
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the JSON config file
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    merge_values(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn parse_env_value(raw: &str) -> Value {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return v;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(last.clone(), value);
    }
}

/// Ollama accepts `OLLAMA_HOST=127.0.0.1:11434`; make it a URL
fn normalize_ollama_host(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn apply_alias_overrides(config: &mut Value) {
    let aliases: [(&str, &str, fn(&str) -> String); 3] = [
        ("DISCORD_TOKEN", "discord.token", |v| v.to_string()),
        ("OLLAMA_HOST", "provider.api_base", normalize_ollama_host),
        ("OPENAI_API_KEY", "provider.api_key", |v| v.to_string()),
    ];

    for (env_key, target_path, transform) in aliases {
        if let Ok(value) = std::env::var(env_key) {
            if value.trim().is_empty() {
                continue;
            }
            let path: Vec<String> = target_path.split('.').map(ToString::to_string).collect();
            set_path_value(config, &path, Value::String(transform(&value)));
        }
    }
}

fn apply_path_overrides(config: &mut Value) {
    for (key, value) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if segments.is_empty() {
            continue;
        }
        set_path_value(config, &segments, parse_env_value(&value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn unset(key: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.original {
                std::env::set_var(&self.key, value);
            } else {
                std::env::remove_var(&self.key);
            }
        }
    }

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_load_default_config() {
        let _lock = lock_env();
        let _token = EnvVarGuard::unset("DISCORD_TOKEN");
        let _host = EnvVarGuard::unset("OLLAMA_HOST");
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.provider.model, "qwen2.5:1.5b");
        assert_eq!(config.provider.api_base, "http://localhost:11434");
        assert_eq!(config.relay.history_limit, 8);
        assert!(config.discord.token.is_empty());
    }

    #[test]
    fn test_save_and_load_config() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.provider.model = "llama3.2:3b".to_string();
        config.relay.system_prompt = "Answer like a pirate".to_string();

        loader.save(&config).unwrap();
        let loaded = loader.load().unwrap();

        assert_eq!(loaded.provider.model, "llama3.2:3b");
        assert_eq!(loaded.relay.system_prompt, "Answer like a pirate");
    }

    #[test]
    fn test_discord_token_from_env() {
        let _lock = lock_env();
        let _token = EnvVarGuard::set("DISCORD_TOKEN", "token-from-env");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert_eq!(config.discord.token, "token-from-env");
        assert_eq!(config.require_discord_token().unwrap(), "token-from-env");
    }

    #[test]
    fn test_discord_token_is_trimmed_on_load() {
        let _lock = lock_env();
        let _token = EnvVarGuard::unset("DISCORD_TOKEN");
        let _path = EnvVarGuard::unset("OLLACORD__DISCORD__TOKEN");

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            "{\"discord\":{\"token\":\"  file-token\\n\"}}",
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.discord.token, "file-token");
        assert_eq!(config.require_discord_token().unwrap(), config.discord.token);
    }

    #[test]
    fn test_ollama_host_without_scheme() {
        let _lock = lock_env();
        let _host = EnvVarGuard::set("OLLAMA_HOST", "127.0.0.1:11434/");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert_eq!(config.provider.api_base, "http://127.0.0.1:11434");
    }

    #[test]
    fn test_load_applies_path_env_overrides() {
        let _lock = lock_env();
        let _limit = EnvVarGuard::set("OLLACORD__RELAY__HISTORY_LIMIT", "12");
        let _timeout = EnvVarGuard::set("OLLACORD__RELAY__INFERENCE_TIMEOUT_SECS", "90");
        let _model = EnvVarGuard::set("OLLACORD__PROVIDER__MODEL", "mistral");
        let _typing = EnvVarGuard::set("OLLACORD__DISCORD__TYPING_INDICATOR", "false");

        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();

        assert_eq!(config.relay.history_limit, 12);
        assert_eq!(config.relay.inference_timeout_secs, 90);
        assert_eq!(config.provider.model, "mistral");
        assert!(!config.discord.typing_indicator);
    }

    #[test]
    fn test_path_env_overrides_alias_and_file() {
        let _lock = lock_env();
        let _alias = EnvVarGuard::set("DISCORD_TOKEN", "alias-token");
        let _path = EnvVarGuard::set("OLLACORD__DISCORD__TOKEN", "\"path-token\"");

        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.json"),
            r#"{"discord":{"token":"file-token"}}"#,
        )
        .unwrap();

        let config = ConfigLoader::with_dir(temp_dir.path()).load().unwrap();
        assert_eq!(config.discord.token, "path-token");
    }

    #[test]
    fn test_validation_rejects_zero_history_limit() {
        let _lock = lock_env();
        let _limit = EnvVarGuard::set("OLLACORD__RELAY__HISTORY_LIMIT", "0");

        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_dir(temp_dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("history_limit"));
    }

    #[test]
    fn test_set_path_value_creates_objects() {
        let mut root = serde_json::json!({"relay": 5});
        set_path_value(
            &mut root,
            &["relay".to_string(), "chunk_size".to_string()],
            Value::from(100),
        );
        assert_eq!(root, serde_json::json!({"relay": {"chunk_size": 100}}));
    }
}
