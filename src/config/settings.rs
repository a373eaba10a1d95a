//! Bot settings loading from config.toml
//!
//! Every field has a default, so an empty file (or a missing one) yields a
//! working configuration. Only a file that exists but fails to parse or
//! holds out-of-range values is an error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{path::Path, time::Duration};
use tracing::{info, warn};

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "MAIDEN_CONFIG";

/// Used when [`CONFIG_PATH_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Application settings, the whole of config.toml
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Command prefix, matched case-insensitively
    pub prefix: String,
    /// User allowed to run owner-only commands
    pub owner_id: Option<u64>,
    /// Enables the dialog test command
    pub debug: bool,
    /// Colour applied to embeds that do not set one
    pub embed_color: u32,
    /// Dialog settings
    pub dialog: DialogConfig,
    /// "Did you mean" settings for unknown commands
    pub suggestions: SuggestionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            prefix: "m!".to_string(),
            owner_id: None,
            debug: false,
            embed_color: 0xFF_FF_FF,
            dialog: DialogConfig::default(),
            suggestions: SuggestionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::Config {
                message: message.to_string(),
            })
        };

        if self.prefix.is_empty() || self.prefix.chars().any(char::is_whitespace) {
            return invalid("prefix must be non-empty and contain no whitespace");
        }
        if !(0.0..=1.0).contains(&self.suggestions.min_similarity) {
            return invalid("suggestions.min_similarity must be between 0 and 1");
        }
        if self.dialog.step_timeout_secs == 0 {
            return invalid("dialog.step_timeout_secs must be at least 1");
        }
        Ok(())
    }
}

/// `[dialog]` table
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DialogConfig {
    /// Seconds a dialog step waits for an answer
    pub step_timeout_secs: u64,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 20,
        }
    }
}

impl DialogConfig {
    /// Inactivity timeout applied to every dialog step.
    #[must_use]
    pub const fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

/// `[suggestions]` table
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Lowest Jaro-Winkler similarity a suggestion may have
    pub min_similarity: f64,
    /// Most suggestions listed
    pub max_suggestions: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.80,
            max_suggestions: 3,
        }
    }
}

/// Parses settings from TOML text.
///
/// # Errors
/// Returns [`Error::Toml`] if the TOML is invalid or a field has the wrong
/// type, and [`Error::Config`] if a value is out of range.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Reads and parses the config file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    parse_config(&contents)
}

/// Loads settings from `$MAIDEN_CONFIG`, or ./config.toml when unset.
///
/// A missing file falls back to the defaults.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_or_default(path)
}

/// Loads settings from `path`, falling back to the defaults if it does not
/// exist.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let config = load_config(path)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
