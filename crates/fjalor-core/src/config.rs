//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/fjalor/config.toml)
//! 3. Environment variables (FJALOR_* prefix)
//!
//! Environment variables take precedence over config file values.
//! The cloud settings live here, in a device-local file separate from the
//! entry data; an absent `api_base_url` means local-only mode.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "FJALOR";

/// File name of the persisted entry blob (the fixed storage key)
pub const ENTRIES_FILE: &str = "digital_dictionary_v1.json";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (entry blob, logs)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base URL of the remote entries API (optional)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Shared passphrase sent with remote writes (optional)
    #[serde(default)]
    pub passphrase: Option<String>,

    /// Log file for the TUI (defaults to `<data_dir>/debug.log`)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Text-to-speech preferences
    #[serde(default)]
    pub speech: SpeechSettings,
}

/// Text-to-speech preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Preferred voice name (engine-specific)
    #[serde(default)]
    pub voice: Option<String>,
    /// Speaking rate multiplier (1.0 = normal)
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Pitch multiplier (1.0 = normal)
    #[serde(default = "default_pitch")]
    pub pitch: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            voice: None,
            rate: default_rate(),
            pitch: default_pitch(),
        }
    }
}

fn default_rate() -> f32 {
    1.0
}

fn default_pitch() -> f32 {
    1.0
}

/// Connection settings for cloud mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Base URL of the API, e.g. `https://dict.example.com`
    pub api_base_url: String,
    /// Optional write passphrase
    pub passphrase: Option<String>,
}

impl CloudConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            passphrase: None,
        }
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api_base_url: None,
            passphrase: None,
            log_file: None,
            speech: SpeechSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (FJALOR_DATA_DIR, FJALOR_API_URL, FJALOR_PASSPHRASE)
    /// 2. Config file (~/.config/fjalor/config.toml or FJALOR_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // FJALOR_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // FJALOR_API_URL
        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            self.api_base_url = if val.is_empty() { None } else { Some(val) };
        }

        // FJALOR_PASSPHRASE
        if let Ok(val) = std::env::var(format!("{}_PASSPHRASE", ENV_PREFIX)) {
            self.passphrase = if val.is_empty() { None } else { Some(val) };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with FJALOR_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fjalor")
            .join("config.toml")
    }

    /// Cloud settings, if a base URL is configured
    pub fn cloud(&self) -> Option<CloudConfig> {
        let base = self.api_base_url.as_deref()?.trim();
        if base.is_empty() {
            return None;
        }
        Some(CloudConfig {
            api_base_url: base.to_string(),
            passphrase: self.passphrase.clone().filter(|p| !p.is_empty()),
        })
    }

    /// Get the path to the persisted entry blob
    pub fn entries_path(&self) -> PathBuf {
        self.data_dir.join(ENTRIES_FILE)
    }

    /// Get the path of the TUI log file
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fjalor")
}
