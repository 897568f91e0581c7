//! Copy configuration and its JSON store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::DEFAULT_DELAY_SECS;

/// Errors that can occur while reading or writing the copy configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which channel to watch, where to copy, and how long to wait.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CopyConfig {
    /// Identifier of the channel to watch (`@handle` or numeric id).
    #[serde(default)]
    pub source_channel: String,

    /// Identifier of the channel posts are copied to.
    #[serde(default)]
    pub target_channel: String,

    /// Delay between receiving a post and copying it.
    #[serde(default = "default_delay")]
    pub delay_seconds: u64,
}

fn default_delay() -> u64 {
    DEFAULT_DELAY_SECS
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            source_channel: String::new(),
            target_channel: String::new(),
            delay_seconds: DEFAULT_DELAY_SECS,
        }
    }
}

impl CopyConfig {
    /// Creates a new copy configuration.
    #[must_use]
    pub fn new(source_channel: String, target_channel: String, delay_seconds: u64) -> Self {
        Self {
            source_channel,
            target_channel,
            delay_seconds,
        }
    }

    /// Whether both channel identifiers are filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.source_channel.trim().is_empty() && !self.target_channel.trim().is_empty()
    }
}

/// Reads and writes a [`CopyConfig`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, creating and persisting the defaults if the
    /// file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the defaults cannot be written.
    pub fn load(&self) -> Result<CopyConfig, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let config = serde_json::from_str(&content).map_err(|source| {
                    StoreError::Parse {
                        path: self.path.clone(),
                        source,
                    }
                })?;
                debug!("Loaded copy configuration from {}", self.path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = CopyConfig::default();
                self.save(&config)?;
                info!(
                    "Created default configuration at {}",
                    self.path.display()
                );
                Ok(config)
            }
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Overwrites the file with `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, config: &CopyConfig) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, content).map_err(io_err)?;
        Ok(())
    }
}
