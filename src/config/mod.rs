//! Configuration module for the copy bot.
//!
//! Handles Telegram API credentials, the per-session file layout and the
//! persisted copy configuration (source, target, delay).

mod copy_config;
mod settings;

pub use copy_config::{ConfigStore, CopyConfig, StoreError};
pub use settings::{ConfigError, SessionPaths, TelegramConfig};

/// Delay used when none is configured or the user leaves the prompt blank.
pub const DEFAULT_DELAY_SECS: u64 = 60;
