//! Copy engine.
//!
//! The engine follows a one-way state machine:
//! 1. `Idle` until [`ForwardEngine::start`] succeeds
//! 2. `Copying` while posts from the source channel are handled
//! 3. `Stopped` once the connection closes or the user interrupts
//!
//! Every accepted post gets its own task: wait out the configured delay
//! (measured from when the post was received), resolve the target channel
//! again, then publish the copy. Tasks do not wait on each other, so copies
//! may land out of order when sends take different amounts of time.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::resolver::resolve;
use super::{ChannelGateway, ChannelHandle, IncomingPost, PostStream};
use crate::config::CopyConfig;
use crate::telegram::TelegramError;

/// Errors raised while copying a single post or starting the engine.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Target channel {0} is unavailable")]
    TargetUnavailable(String),

    #[error("Failed to send copy: {0}")]
    Send(#[from] TelegramError),

    #[error("Engine has already stopped; restart the program to copy again")]
    Stopped,
}

/// Lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Copying,
    Stopped,
}

/// Why [`ForwardEngine::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested locally (Ctrl+C).
    Interrupted,
    /// The update stream ended or failed.
    Disconnected,
}

#[derive(Debug)]
struct EngineInner {
    state: EngineState,
    source_id: Option<i64>,
}

/// Watches one channel and republishes its posts to another.
pub struct ForwardEngine<G: ChannelGateway> {
    /// Remote operations.
    gateway: Arc<G>,

    /// Source, target and delay.
    config: Arc<CopyConfig>,

    /// Guard checked by every incoming post.
    copying: AtomicBool,

    /// Lifecycle state and the watched channel.
    inner: RwLock<EngineInner>,
}

impl<G: ChannelGateway> ForwardEngine<G> {
    /// Creates an idle engine.
    #[must_use]
    pub fn new(gateway: Arc<G>, config: CopyConfig) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
            copying: AtomicBool::new(false),
            inner: RwLock::new(EngineInner {
                state: EngineState::Idle,
                source_id: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> EngineState {
        self.inner.read().await.state
    }

    /// Whether incoming posts are currently being copied.
    #[must_use]
    pub fn is_copying(&self) -> bool {
        self.copying.load(Ordering::Acquire)
    }

    /// Starts copying posts from `source` to `target`.
    ///
    /// Calling this while already copying is a no-op.
    pub async fn start(&self, source: &G::Channel, target: &G::Channel) -> Result<(), ForwardError> {
        let mut inner = self.inner.write().await;

        match inner.state {
            EngineState::Copying => {
                info!("Copying is already running");
                return Ok(());
            }
            EngineState::Stopped => return Err(ForwardError::Stopped),
            EngineState::Idle => {}
        }

        info!("Watching channel: {}", source.title());
        info!("Copying to channel: {}", target.title());
        info!("Delay: {} seconds", self.config.delay_seconds);

        inner.state = EngineState::Copying;
        inner.source_id = Some(source.dialog_id());
        self.copying.store(true, Ordering::Release);

        Ok(())
    }

    /// Stops copying. Copies already past their delay still finish.
    pub async fn stop(&self) {
        self.copying.store(false, Ordering::Release);
        let mut inner = self.inner.write().await;
        if inner.state != EngineState::Stopped {
            info!("Stopping copy engine");
            inner.state = EngineState::Stopped;
        }
    }

    /// Accepts a post and schedules its copy.
    ///
    /// Returns the handle of the spawned copy task, or `None` when the post
    /// was ignored (engine not copying, other channel, nothing to copy).
    pub async fn handle_post(
        &self,
        post: IncomingPost<G::Media>,
    ) -> Option<JoinHandle<Result<(), ForwardError>>> {
        if !self.is_copying() {
            return None;
        }

        let source_id = self.inner.read().await.source_id;
        if source_id != Some(post.chat_id) {
            debug!("Ignoring message {} from chat {}", post.id, post.chat_id);
            return None;
        }

        if post.is_empty() {
            debug!("Skipping post {} without text or media", post.id);
            return None;
        }

        info!("New post {} in source channel", post.id);

        let gateway = Arc::clone(&self.gateway);
        let config = Arc::clone(&self.config);
        Some(tokio::spawn(async move {
            let result = copy_post(gateway.as_ref(), &config, &post).await;
            if let Err(e) = &result {
                error!("Failed to copy post {}: {}", post.id, e);
            }
            result
        }))
    }

    /// Feeds posts from `posts` into the engine until the stream closes or
    /// `shutdown` completes, then stops the engine.
    pub async fn run<S, F>(&self, posts: &mut S, shutdown: F) -> StopReason
    where
        S: PostStream<Media = G::Media>,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break StopReason::Interrupted;
                }
                next = posts.next_post() => match next {
                    Ok(Some(post)) => {
                        // Copy tasks run detached.
                        self.handle_post(post).await;
                    }
                    Ok(None) => {
                        warn!("Update stream closed");
                        break StopReason::Disconnected;
                    }
                    Err(e) => {
                        error!("Update stream failed: {}", e);
                        break StopReason::Disconnected;
                    }
                }
            }
        };

        self.stop().await;
        reason
    }
}

impl<G: ChannelGateway> std::fmt::Debug for ForwardEngine<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardEngine")
            .field("config", &self.config)
            .field("copying", &self.is_copying())
            .finish_non_exhaustive()
    }
}

/// Waits out the delay, then copies `post` to the target channel.
async fn copy_post<G: ChannelGateway>(
    gateway: &G,
    config: &CopyConfig,
    post: &IncomingPost<G::Media>,
) -> Result<(), ForwardError> {
    if config.delay_seconds > 0 {
        let delay = Duration::from_secs(config.delay_seconds);
        match due_time(delay) {
            Some(due) => info!(
                "Waiting {} seconds (copy at {})...",
                config.delay_seconds,
                due.format("%H:%M:%S")
            ),
            None => info!("Waiting {} seconds...", config.delay_seconds),
        }

        match post.received_at.checked_add(delay) {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => tokio::time::sleep(delay).await,
        }
    }

    let target = resolve(gateway, &config.target_channel)
        .await
        .ok_or_else(|| ForwardError::TargetUnavailable(config.target_channel.clone()))?;

    gateway.send_copy(&target, post).await?;

    info!(
        "Post {} copied to {} ({})",
        post.id,
        config.target_channel,
        if post.media.is_some() { "with media" } else { "text" }
    );
    Ok(())
}

/// Wall-clock time at which a copy delayed by `delay` is due.
fn due_time(delay: Duration) -> Option<DateTime<Local>> {
    let delta = TimeDelta::from_std(delay).ok()?;
    Local::now().checked_add_signed(delta)
}
