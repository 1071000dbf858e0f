//! Configuration management for the escrow client.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default API base URL (can be overridden at compile time via ESCROW_API_BASE_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("ESCROW_API_BASE_URL") {
    Some(url) => url,
    None => "http://localhost:8000/",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Runtime environment variable that overrides the API base URL.
const API_BASE_URL_ENV: &str = "ESCROW_API_BASE_URL";
/// Runtime environment variable that overrides the log level.
const LOG_LEVEL_ENV: &str = "ESCROW_LOG_LEVEL";

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl Config {
    /// Defaults, then environment overrides.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file (if any), then apply
    /// environment overrides on top.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup. Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = non_empty(API_BASE_URL_ENV) {
            self.api_base_url = url;
        }
        if let Some(level) = non_empty(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
    }

    /// Check that the configured values are usable.
    pub fn validate(&self) -> ConfigResult<()> {
        self.api_base_url().map(|_| ())
    }

    /// The API base URL, normalised to end with `/` so that relative
    /// endpoint paths join underneath it.
    pub fn api_base_url(&self) -> ConfigResult<Url> {
        let mut url = Url::parse(&self.api_base_url)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "API base URL must be http or https, got {}",
                url.scheme()
            )));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }
}
