//! Interactive console setup.
//!
//! Asks for the session name and, on first run, for the channels to copy
//! between and the delay. Everything here finishes before the copy loop
//! starts. Console reads run on the blocking pool so a pending prompt never
//! holds up the runtime.

mod prompter;
mod wizard;

pub use prompter::{ConsolePrompter, Prompter, ScriptedPrompter};
pub use wizard::{parse_delay, prompt_for_config, prompt_session_name, settings_summary};

use std::io;

use crate::config::StoreError;

/// Errors raised while talking to the user.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Failed to read console input: {0}")]
    Prompt(dialoguer::Error),

    /// The user pressed Ctrl+C at a prompt.
    #[error("Interrupted at the prompt")]
    Interrupted,

    #[error("Console input task failed: {0}")]
    Console(#[from] tokio::task::JoinError),

    #[error("Input closed while waiting for: {0}")]
    InputClosed(String),

    #[error("Session name cannot be empty")]
    EmptySessionName,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<dialoguer::Error> for SetupError {
    fn from(err: dialoguer::Error) -> Self {
        // In raw mode the terminal delivers Ctrl+C as a key, which the
        // console layer reports as an interrupted read.
        match err {
            dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::Interrupted => Self::Interrupted,
            other => Self::Prompt(other),
        }
    }
}
