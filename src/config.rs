use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_CONTENT_URL: &str = "http://localhost:8000/content.json";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

pub const DEFAULT_GREETING: &str =
    "Hi! I'm the docs assistant.\n\nAsk me anything about this site.";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
You are the AI assistant for this documentation site.

## Answer rules
1. Answer using the documentation below
2. Link with the full URLs found in the documentation
3. Format answers in Markdown
4. Use fenced code blocks for commands and code

## Documentation
{context}";

/// On-disk configuration. Every field is optional; unset values fall back
/// to environment variables and then to defaults when resolved.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub content_url: Option<String>,
    pub base_url: Option<String>,
    pub greeting: Option<String>,
    pub system_instruction: Option<String>,
    pub history_path: Option<PathBuf>,
    pub plain_text: Option<bool>,
}

/// Fully resolved settings the rest of the app works with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend_url: String,
    pub content_url: String,
    pub base_url: String,
    pub greeting: String,
    pub system_instruction: String,
    pub history_path: PathBuf,
    pub plain_text: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let raw = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("docchat").join("config.json"))
    }

    /// Environment variables win over the config file, which wins over
    /// defaults. No validation is performed on any value.
    pub fn resolve(self) -> Settings {
        Settings {
            backend_url: env_or("DOCCHAT_BACKEND_URL", self.backend_url, DEFAULT_BACKEND_URL),
            content_url: env_or("DOCCHAT_CONTENT_URL", self.content_url, DEFAULT_CONTENT_URL),
            base_url: env_or("DOCCHAT_BASE_URL", self.base_url, DEFAULT_BASE_URL),
            greeting: env_or("DOCCHAT_GREETING", self.greeting, DEFAULT_GREETING),
            system_instruction: self
                .system_instruction
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            history_path: std::env::var("DOCCHAT_HISTORY_PATH")
                .ok()
                .map(PathBuf::from)
                .or(self.history_path)
                .unwrap_or_else(default_history_path),
            plain_text: self.plain_text.unwrap_or(false),
        }
    }
}

fn env_or(name: &str, value: Option<String>, default: &str) -> String {
    std::env::var(name)
        .ok()
        .or(value)
        .unwrap_or_else(|| default.to_string())
}

fn default_history_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("docchat")
        .join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let settings = Config::new().resolve();
        assert_eq!(settings.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(settings.content_url, DEFAULT_CONTENT_URL);
        assert_eq!(settings.greeting, DEFAULT_GREETING);
        assert!(settings.system_instruction.contains("{context}"));
        assert!(!settings.plain_text);
    }

    #[test]
    fn config_values_override_defaults() {
        let config = Config {
            backend_url: Some("https://app.up.railway.app".to_string()),
            base_url: Some("https://user.github.io/notes".to_string()),
            plain_text: Some(true),
            ..Config::new()
        };
        let settings = config.resolve();
        assert_eq!(settings.backend_url, "https://app.up.railway.app");
        assert_eq!(settings.base_url, "https://user.github.io/notes");
        assert!(settings.plain_text);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = Config {
            greeting: Some("hola".to_string()),
            history_path: Some(PathBuf::from("/tmp/s.json")),
            ..Config::new()
        };
        let raw = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.greeting.as_deref(), Some("hola"));
        assert_eq!(back.history_path, Some(PathBuf::from("/tmp/s.json")));
    }
}
