//! Channel identifiers as typed by the user.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Prefixes stripped from `t.me` links.
const LINK_PREFIXES: [&str; 4] = ["https://t.me/", "http://t.me/", "t.me/", "tg://resolve?domain="];

/// Offset Telegram adds to channel ids in the "bot API" form (`-100…`).
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Errors produced when parsing a channel identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelRefError {
    #[error("Channel identifier is empty")]
    Empty,

    #[error("Invalid channel username: '{0}'")]
    InvalidUsername(String),
}

/// A channel as referenced in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelRef {
    /// Numeric id, either in `-100…` form or the bare channel id.
    Id(i64),
    /// Public username, without the leading `@`.
    Username(String),
}

impl ChannelRef {
    /// Checks whether a dialog with the given ids is the one referenced.
    ///
    /// `dialog_id` is the marked (`-100…`) id, `bare_id` the unmarked one.
    #[must_use]
    pub fn matches_id(&self, dialog_id: i64, bare_id: i64) -> bool {
        match self {
            Self::Id(id) => *id == dialog_id || *id == bare_id,
            Self::Username(_) => false,
        }
    }

    /// Bare channel id for a marked `-100…` id, if it is one.
    #[must_use]
    pub fn unmarked_channel_id(id: i64) -> Option<i64> {
        (id < -CHANNEL_ID_OFFSET).then(|| -id - CHANNEL_ID_OFFSET)
    }
}

impl FromStr for ChannelRef {
    type Err = ChannelRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut value = s.trim();
        if value.is_empty() {
            return Err(ChannelRefError::Empty);
        }

        if let Ok(id) = value.parse::<i64>() {
            return Ok(Self::Id(id));
        }

        for prefix in LINK_PREFIXES {
            if let Some(rest) = value.strip_prefix(prefix) {
                value = rest;
                break;
            }
        }
        let value = value.trim_start_matches('@').trim_end_matches('/');

        if value.is_empty() {
            return Err(ChannelRefError::Empty);
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ChannelRefError::InvalidUsername(value.to_owned()));
        }

        Ok(Self::Username(value.to_owned()))
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "@{name}"),
        }
    }
}
