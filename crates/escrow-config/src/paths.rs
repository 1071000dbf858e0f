//! File system paths for the escrow client.

use crate::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// Directory name under the home directory.
const BASE_DIR_NAME: &str = ".escrow";

/// Resolves where the client keeps its config, session and logs.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.escrow)
    base_dir: PathBuf,
}

impl Paths {
    /// Paths rooted at `~/.escrow`.
    pub fn new() -> ConfigResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Paths rooted at a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Config file path (~/.escrow/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Durable session storage (~/.escrow/session.json). Holds the refresh
    /// token only; access tokens are never written to disk.
    pub fn session_file(&self) -> PathBuf {
        self.base_dir.join("session.json")
    }

    /// Logs directory (~/.escrow/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// JSONL log file (~/.escrow/logs/escrow.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("escrow.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
