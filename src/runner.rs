//! One run of the bot for a named session.
//!
//! Startup goes config load → sign-in → setup (first run or
//! `--reconfigure`) → settings summary → channel checks. Copying only begins
//! once both channels resolve. Shutdown can be requested at any point; until
//! the engine is running it simply abandons startup.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigStore, CopyConfig, SessionPaths, StoreError};
use crate::forward::{ForwardEngine, ForwardError, StopReason, Subscribe, resolve};
use crate::session::{AuthError, LoginApi, authorize};
use crate::setup::{Prompter, SetupError, prompt_for_config, settings_summary};
use crate::telegram::TelegramError;

/// Switches for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Ask for source, target and delay even when already configured.
    pub reconfigure: bool,
}

/// Errors that end a run before or while copying starts.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to load copy configuration: {0}")]
    Config(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("Could not access source channel {0}")]
    SourceUnavailable(String),

    #[error("Could not access target channel {0}")]
    TargetUnavailable(String),

    #[error(transparent)]
    Engine(#[from] ForwardError),

    #[error("Failed to subscribe to updates: {0}")]
    Subscribe(TelegramError),
}

impl RunError {
    /// Whether the user pressed Ctrl+C at a prompt.
    #[must_use]
    pub fn is_interrupt(&self) -> bool {
        matches!(
            self,
            Self::Setup(SetupError::Interrupted)
                | Self::Auth(AuthError::Setup(SetupError::Interrupted))
        )
    }
}

/// Signs in, makes sure the copy configuration is complete, then copies
/// posts until `shutdown` completes or the connection closes.
///
/// The returned [`StopReason`] is `Interrupted` whenever `shutdown` fires,
/// including during the prompts, so callers can always say goodbye and
/// disconnect.
pub async fn run<B, F>(
    bot: Arc<B>,
    paths: &SessionPaths,
    prompter: &mut dyn Prompter,
    options: RunOptions,
    shutdown: F,
) -> Result<StopReason, RunError>
where
    B: LoginApi + Subscribe,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let startup = tokio::select! {
        result = prepare(bot.as_ref(), paths, prompter, options) => result,
        () = &mut shutdown => {
            info!("Shutdown requested during startup");
            return Ok(StopReason::Interrupted);
        }
    };

    let (config, source, target) = match startup {
        Ok(ready) => ready,
        Err(e) if e.is_interrupt() => return Ok(StopReason::Interrupted),
        Err(e) => return Err(e),
    };

    let engine = ForwardEngine::new(Arc::clone(&bot), config);
    engine.start(&source, &target).await?;

    let mut posts = bot.subscribe().await.map_err(RunError::Subscribe)?;

    info!("Copying started! Press Ctrl+C to stop");

    Ok(engine.run(&mut posts, &mut shutdown).await)
}

/// Everything that happens before copying starts.
async fn prepare<B>(
    bot: &B,
    paths: &SessionPaths,
    prompter: &mut dyn Prompter,
    options: RunOptions,
) -> Result<(CopyConfig, B::Channel, B::Channel), RunError>
where
    B: LoginApi + Subscribe,
{
    let store = ConfigStore::new(paths.config_file());
    let mut config = store.load()?;

    authorize(bot, paths.name(), prompter).await?;

    if options.reconfigure || !config.is_complete() {
        config = prompt_for_config(prompter, &store).await?;
    }

    prompter.say(&settings_summary(&config));

    let source = resolve(bot, &config.source_channel)
        .await
        .ok_or_else(|| RunError::SourceUnavailable(config.source_channel.clone()))?;
    let target = resolve(bot, &config.target_channel)
        .await
        .ok_or_else(|| RunError::TargetUnavailable(config.target_channel.clone()))?;

    Ok((config, source, target))
}
