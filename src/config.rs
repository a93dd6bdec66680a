//! Environment configuration.
//!
//! Values come from the process environment, after `.env` has been loaded in
//! `main`. Lookups go through a closure so tests do not touch the real
//! environment.

use std::time::Duration;
use thiserror::Error;

use crate::planner::client::DEFAULT_BASE_URL;

const DEFAULT_DATABASE_URL: &str = "sqlite:data/tripcraft.db";
const DEFAULT_SHARE_BASE_URL: &str = "https://tripcraft.app/";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Set GEMINI_API_KEY (or API_KEY) to use the planner, assistant, scanner and audio guides")]
    MissingApiKey,
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Models used for each feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub planner: String,
    pub assistant: String,
    pub speech: String,
    /// Prebuilt voice for audio guides
    pub voice: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            planner: "gemini-2.5-flash".to_string(),
            assistant: "gemini-3-flash-preview".to_string(),
            speech: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Kore".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    api_key: Option<String>,
    pub base_url: String,
    pub models: ModelConfig,
    pub database_url: String,
    pub share_base_url: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = ModelConfig::default();

        let request_timeout = match var("TRIPCRAFT_REQUEST_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value.trim().parse::<u64>().ok().filter(|s| *s > 0).ok_or(
                    ConfigError::Invalid {
                        name: "TRIPCRAFT_REQUEST_TIMEOUT_SECS",
                        value,
                    },
                )?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            models: ModelConfig {
                planner: var("TRIPCRAFT_PLANNER_MODEL").unwrap_or(defaults.planner),
                assistant: var("TRIPCRAFT_ASSISTANT_MODEL").unwrap_or(defaults.assistant),
                speech: var("TRIPCRAFT_TTS_MODEL").unwrap_or(defaults.speech),
                voice: var("TRIPCRAFT_VOICE").unwrap_or(defaults.voice),
            },
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            share_base_url: var("TRIPCRAFT_SHARE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SHARE_BASE_URL.to_string()),
            request_timeout,
        })
    }

    /// The API credential, required only by commands that call the model
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, "sqlite:data/tripcraft.db");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.models, ModelConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_api_key_fallback() {
        let config = config_from(&[("API_KEY", "legacy")]).unwrap();
        assert_eq!(config.api_key().unwrap(), "legacy");

        let config = config_from(&[("API_KEY", "legacy"), ("GEMINI_API_KEY", "primary")]).unwrap();
        assert_eq!(config.api_key().unwrap(), "primary");

        let config = config_from(&[("GEMINI_API_KEY", "  ")]).unwrap();
        assert!(config.api_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TRIPCRAFT_VOICE", "Puck"),
            ("TRIPCRAFT_PLANNER_MODEL", "gemini-2.5-pro"),
            ("TRIPCRAFT_REQUEST_TIMEOUT_SECS", "15"),
        ])
        .unwrap();
        assert_eq!(config.models.voice, "Puck");
        assert_eq!(config.models.planner, "gemini-2.5-pro");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_timeout() {
        for bad in ["soon", "0"] {
            assert!(matches!(
                config_from(&[("TRIPCRAFT_REQUEST_TIMEOUT_SECS", bad)]),
                Err(ConfigError::Invalid { .. })
            ));
        }
    }
}
