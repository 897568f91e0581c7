//! First-run setup prompts.

use std::num::ParseIntError;

use tracing::info;

use super::{Prompter, SetupError};
use crate::config::{ConfigStore, CopyConfig, DEFAULT_DELAY_SECS};

/// Parses the delay answer. Blank input means the default delay.
pub fn parse_delay(input: &str) -> Result<u64, ParseIntError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(DEFAULT_DELAY_SECS);
    }
    input.parse()
}

/// Asks for the session name.
pub async fn prompt_session_name(prompter: &mut dyn Prompter) -> Result<String, SetupError> {
    let name = prompter.input("Session name", true).await?;
    let name = name.trim();
    if name.is_empty() {
        return Err(SetupError::EmptySessionName);
    }
    Ok(name.to_owned())
}

/// Asks for source, target and delay, then persists the result.
pub async fn prompt_for_config(
    prompter: &mut dyn Prompter,
    store: &ConfigStore,
) -> Result<CopyConfig, SetupError> {
    prompter.say("\n=== Bot setup ===");

    let source = prompter
        .input(
            "Source channel ID/username (e.g. @channel_name or -1001234567890)",
            false,
        )
        .await?;
    let target = prompter
        .input(
            "Target channel ID/username (e.g. @channel_name or -1001234567890)",
            false,
        )
        .await?;

    let delay_seconds = loop {
        let answer = prompter
            .input(
                &format!("Delay in seconds before copying a post (default {DEFAULT_DELAY_SECS})"),
                true,
            )
            .await?;
        match parse_delay(&answer) {
            Ok(delay) => break delay,
            Err(_) => prompter.say("Please enter a whole number of seconds"),
        }
    };

    let config = CopyConfig::new(
        source.trim().to_owned(),
        target.trim().to_owned(),
        delay_seconds,
    );
    store.save(&config)?;

    info!("Configuration saved to {}", store.path().display());
    prompter.say("✓ Configuration saved!");

    Ok(config)
}

/// Renders the current settings for display.
#[must_use]
pub fn settings_summary(config: &CopyConfig) -> String {
    format!(
        "\n=== Current settings ===\n\
         Source channel: {}\n\
         Target channel: {}\n\
         Delay: {} seconds",
        config.source_channel, config.target_channel, config.delay_seconds
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::ScriptedPrompter;

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_delay("5").unwrap(), 5);
        assert_eq!(parse_delay(" 0 ").unwrap(), 0);
        assert_eq!(parse_delay("").unwrap(), 60);
        assert_eq!(parse_delay("   ").unwrap(), 60);
        assert!(parse_delay("abc").is_err());
        assert!(parse_delay("-5").is_err());
        assert!(parse_delay("1.5").is_err());
    }

    #[tokio::test]
    async fn test_prompt_for_config_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let mut prompter = ScriptedPrompter::new(&["@src", "@dst", "5"]);

        let config = prompt_for_config(&mut prompter, &store).await.unwrap();
        assert_eq!(config, CopyConfig::new("@src".to_owned(), "@dst".to_owned(), 5));
        assert_eq!(store.load().unwrap(), config);
    }

    #[tokio::test]
    async fn test_prompt_for_config_reprompts_on_bad_delay() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let mut prompter = ScriptedPrompter::new(&["@src", "@dst", "soon", "-3", "12"]);

        let config = prompt_for_config(&mut prompter, &store).await.unwrap();
        assert_eq!(config.delay_seconds, 12);
        assert_eq!(
            prompter
                .said()
                .iter()
                .filter(|line| line.contains("whole number"))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_prompt_for_config_blank_delay_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let mut prompter = ScriptedPrompter::new(&["@src", "@dst", ""]);

        let config = prompt_for_config(&mut prompter, &store).await.unwrap();
        assert_eq!(config.delay_seconds, 60);
    }

    #[tokio::test]
    async fn test_prompt_session_name_rejects_blank() {
        let mut prompter = ScriptedPrompter::new(&["  "]);
        assert!(matches!(
            prompt_session_name(&mut prompter).await,
            Err(SetupError::EmptySessionName)
        ));

        let mut prompter = ScriptedPrompter::new(&[" demo "]);
        assert_eq!(prompt_session_name(&mut prompter).await.unwrap(), "demo");
    }

    #[test]
    fn test_settings_summary() {
        let summary = settings_summary(&CopyConfig::new("@a".to_owned(), "@b".to_owned(), 7));
        assert!(summary.contains("Source channel: @a"));
        assert!(summary.contains("Target channel: @b"));
        assert!(summary.contains("Delay: 7 seconds"));
    }
}
