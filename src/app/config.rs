use crate::domain::types::Device;
use anyhow::{bail, Context, Result};
use crate::transcription::normalize_language;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default)]
    pub threads: u16,
    #[serde(default)]
    pub models_dir: Option<String>,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_model() -> String {
    "base".to_string()
}

fn default_language() -> String {
    "auto".to_string() // detect from audio
}

fn default_device() -> String {
    "auto".to_string() // "auto", "cpu" or "gpu"
}

fn default_output_format() -> String {
    "json".to_string() // "json" or "text"
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            language: default_language(),
            device: default_device(),
            threads: 0,
            models_dir: None,
            output_format: default_output_format(),
        }
    }
}

impl Config {
    /// Validates config values after loading. Clamps out-of-range values
    /// and rejects clearly invalid inputs.
    pub fn validate(&mut self) -> Result<()> {
        if self.default_model.trim().is_empty() {
            bail!("Model name must not be empty");
        }

        // default_model is a tag or filename, never a path
        if self.default_model.contains('/')
            || self.default_model.contains('\\')
            || self.default_model.contains("..")
        {
            bail!("Invalid model name: {}", self.default_model);
        }

        self.threads = self.threads.min(64);

        if self.device.parse::<Device>().is_err() {
            self.device = default_device();
        }

        if !["json", "text"].contains(&self.output_format.as_str()) {
            self.output_format = default_output_format();
        }

        if self.language.trim().is_empty() {
            self.language = default_language();
        } else if let Err(e) = normalize_language(&self.language) {
            warn!("{:#}, detecting language instead", e);
            self.language = default_language();
        }

        Ok(())
    }

    /// Model cache directory: config override or the platform default.
    pub fn models_dir(&self) -> PathBuf {
        self.models_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(models_dir)
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("whisper-transcribe")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("whisper")
}

/// Load the config from the default location, or defaults if absent.
pub fn load_config() -> Result<Config> {
    let path = config_path();

    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    load_config_from(&path)
}

/// Load and validate a config file at an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

// === Trait Implementation ===

use crate::domain::traits::ConfigProvider;

impl ConfigProvider for Config {
    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn language(&self) -> Option<String> {
        match self.language.as_str() {
            "auto" => None,
            lang => Some(lang.to_string()),
        }
    }

    fn device(&self) -> Device {
        self.device.parse().unwrap_or_default()
    }

    fn threads(&self) -> u16 {
        self.threads
    }
}
