use async_trait::async_trait;
use tokio::time::Instant;

use crate::telegram::{ChannelRef, TelegramError};

/// A resolved channel, valid for the lifetime of the current connection.
pub trait ChannelHandle: Clone + Send + Sync + 'static {
    /// Marked dialog id (`-100…` for channels).
    fn dialog_id(&self) -> i64;

    /// Human readable channel title.
    fn title(&self) -> &str;
}

/// A new post seen in a watched channel.
#[derive(Debug, Clone)]
pub struct IncomingPost<M> {
    /// Message id inside the source channel.
    pub id: i32,

    /// Marked dialog id of the channel the post appeared in.
    pub chat_id: i64,

    /// Post body rendered as HTML.
    pub text: String,

    /// Attached media, if any.
    pub media: Option<M>,

    /// When the post was received by this process.
    pub received_at: Instant,
}

impl<M> IncomingPost<M> {
    /// Creates a post received now.
    #[must_use]
    pub fn new(id: i32, chat_id: i64, text: String, media: Option<M>) -> Self {
        Self {
            id,
            chat_id,
            text,
            media,
            received_at: Instant::now(),
        }
    }

    /// Whether there is anything to copy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.media.is_none()
    }
}

/// Remote operations the copy engine relies on.
///
/// Telegram is the only implementation; tests use in-memory fakes.
#[async_trait]
pub trait ChannelGateway: Send + Sync + 'static {
    /// Resolved channel type.
    type Channel: ChannelHandle;

    /// Media payload carried by posts.
    type Media: Clone + Send + Sync + 'static;

    /// Looks up a channel by id or username.
    async fn resolve_channel(&self, reference: &ChannelRef) -> Result<Self::Channel, TelegramError>;

    /// Publishes `post` to `target`: text plus the media attachment when
    /// present, with the body interpreted as HTML.
    async fn send_copy(
        &self,
        target: &Self::Channel,
        post: &IncomingPost<Self::Media>,
    ) -> Result<(), TelegramError>;
}

/// Stream of new posts coming from the connection.
#[async_trait]
pub trait PostStream: Send {
    /// Media payload carried by posts.
    type Media: Send;

    /// Waits for the next post. `Ok(None)` means the connection is closed.
    async fn next_post(&mut self) -> Result<Option<IncomingPost<Self::Media>>, TelegramError>;
}

#[async_trait]
impl<M: Send> PostStream for tokio::sync::mpsc::Receiver<IncomingPost<M>> {
    type Media = M;

    async fn next_post(&mut self) -> Result<Option<IncomingPost<M>>, TelegramError> {
        Ok(self.recv().await)
    }
}

/// Connection that can hand out its stream of new posts.
#[async_trait]
pub trait Subscribe: ChannelGateway {
    /// Stream type returned by [`Subscribe::subscribe`].
    type Posts: PostStream<Media = Self::Media>;

    /// Starts delivering new posts. Called once, after copying is switched
    /// on.
    async fn subscribe(&self) -> Result<Self::Posts, TelegramError>;
}
