//! Telegram credentials and per-session file layout.

use std::path::{Path, PathBuf};

/// Telegram API configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,
}

impl TelegramConfig {
    /// Creates configuration from environment variables.
    ///
    /// Expects `API_ID` and `API_HASH` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_id: i32 = lookup("API_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("API_ID"))?
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = lookup("API_HASH")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingEnvVar("API_HASH"))?;

        Ok(Self { api_id, api_hash })
    }
}

/// File locations owned by a single named session.
///
/// Everything lives under `<root>/<name>/`: the grammers session database
/// and the copy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    name: String,
    dir: PathBuf,
}

impl SessionPaths {
    /// Extension of the persisted session credential.
    pub const SESSION_EXTENSION: &'static str = "session";

    /// Name of the copy configuration file inside the session directory.
    pub const CONFIG_FILE: &'static str = "config.json";

    /// Creates the layout for `name` under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or would escape `root`.
    pub fn new(root: impl AsRef<Path>, name: &str) -> Result<Self, ConfigError> {
        let name = name.trim();
        validate_session_name(name)?;

        Ok(Self {
            name: name.to_owned(),
            dir: root.as_ref().join(name),
        })
    }

    /// The session name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding all files of this session.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the session credential, `<dir>/<name>.session`.
    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.name, Self::SESSION_EXTENSION))
    }

    /// Path of the copy configuration, `<dir>/config.json`.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.dir.join(Self::CONFIG_FILE)
    }

    /// Creates the session directory if it does not exist yet.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }
}

/// Rejects names that are empty or not a single path component.
fn validate_session_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptySessionName);
    }

    if name == "." || name.contains("..") || name.contains(['/', '\\']) {
        return Err(ConfigError::InvalidSessionName(name.to_owned()));
    }

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be an integer)")]
    InvalidApiId,

    #[error("Session name cannot be empty")]
    EmptySessionName,

    #[error("Invalid session name '{0}' (must not contain path separators or '..')")]
    InvalidSessionName(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_valid() {
        let config =
            TelegramConfig::from_lookup(lookup_from(&[("API_ID", " 42 "), ("API_HASH", "h")]))
                .unwrap();
        assert_eq!(config.api_id, 42);
        assert_eq!(config.api_hash, "h");
    }

    #[test]
    fn test_from_lookup_missing_id() {
        let err = TelegramConfig::from_lookup(lookup_from(&[("API_HASH", "h")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("API_ID")));
    }

    #[test]
    fn test_from_lookup_blank_hash() {
        let err = TelegramConfig::from_lookup(lookup_from(&[("API_ID", "1"), ("API_HASH", "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("API_HASH")));
    }

    #[test]
    fn test_from_lookup_invalid_id() {
        let err =
            TelegramConfig::from_lookup(lookup_from(&[("API_ID", "abc"), ("API_HASH", "h")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiId));
    }

    #[test]
    fn test_session_paths_layout() {
        let paths = SessionPaths::new("sessions", "demo").unwrap();
        assert_eq!(paths.name(), "demo");
        assert_eq!(paths.dir(), Path::new("sessions/demo"));
        assert_eq!(paths.session_file(), PathBuf::from("sessions/demo/demo.session"));
        assert_eq!(paths.config_file(), PathBuf::from("sessions/demo/config.json"));
    }

    #[test]
    fn test_session_name_is_trimmed() {
        let paths = SessionPaths::new("sessions", "  demo ").unwrap();
        assert_eq!(paths.name(), "demo");
    }

    #[test]
    fn test_session_name_rejected() {
        assert!(matches!(
            SessionPaths::new("sessions", "   "),
            Err(ConfigError::EmptySessionName)
        ));
        assert!(matches!(
            SessionPaths::new("sessions", "../escape"),
            Err(ConfigError::InvalidSessionName(_))
        ));
        assert!(matches!(
            SessionPaths::new("sessions", "a/b"),
            Err(ConfigError::InvalidSessionName(_))
        ));
    }
}
