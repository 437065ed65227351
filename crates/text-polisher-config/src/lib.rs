use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use text_polisher_engine::{DEFAULT_SYSTEM_PROMPT, OVERLAY_MARGIN, SessionOptions};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:11434/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "qwen2.5:1.5b";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

// Kept low so small local models stay on task
fn default_temperature() -> f32 {
    0.6
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_overlay_margin() -> f64 {
    OVERLAY_MARGIN
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completions endpoint of the local rewriting service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model name as listed by `ollama list`
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Gap between the result overlay and the viewport edges, in px
    #[serde(default = "default_overlay_margin")]
    pub overlay_margin: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            overlay_margin: default_overlay_margin(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load the config file, or fall back to defaults when there is none
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/text-polisher");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Label of the dialog the result falls back to when it cannot be applied
    pub fn result_label(&self) -> String {
        format!("Polished result ({}):", self.model)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            system_prompt: self.system_prompt.clone(),
            result_label: self.result_label(),
            overlay_margin: self.overlay_margin,
        }
    }
}
