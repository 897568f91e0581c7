//! Telegram client wrapper for channel copying.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grammers_client::client::{LoginToken, PasswordToken, UpdateStream, UpdatesConfiguration};
use grammers_client::media::Media;
use grammers_client::message::{InputMessage, Message};
use grammers_client::peer::Peer;
use grammers_client::update::Update;
use grammers_client::{Client, InvocationError, SenderPool, SignInError, sender};
use grammers_session::storages::SqliteSession;
use grammers_session::updates::UpdatesLike;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::ChannelRef;
use crate::config::TelegramConfig;
use crate::forward::{ChannelGateway, ChannelHandle, IncomingPost, PostStream, Subscribe};
use crate::session::{Account, LoginApi, SignInStep};

/// Raw update channel handed out by the sender pool.
type RawUpdatesReceiver = mpsc::UnboundedReceiver<UpdatesLike>;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Invalid login code")]
    InvalidCode,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Channel not found: {0}")]
    NotFound(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        // Check for flood wait errors
        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str) {
                return Self::FloodWait(seconds);
            }

        if err_str.contains("CHANNEL_PRIVATE")
            || err_str.contains("CHANNEL_INVALID")
            || err_str.contains("USERNAME_NOT_OCCUPIED")
            || err_str.contains("USERNAME_INVALID")
        {
            return Self::NotFound(err_str);
        }

        Self::Invocation(err_str)
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];

    for pattern in patterns {
        if let Some(idx) = err_msg
            .to_ascii_lowercase()
            .find(&pattern.to_ascii_lowercase())
        {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// A channel resolved through the Telegram connection.
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    dialog_id: i64,
    title: String,
    peer: Peer,
}

impl TelegramChannel {
    fn from_peer(peer: Peer) -> Self {
        let dialog_id = peer.id().bot_api_dialog_id();
        let title = peer
            .name()
            .map_or_else(|| dialog_id.to_string(), str::to_owned);
        Self {
            dialog_id,
            title,
            peer,
        }
    }

    /// The underlying peer.
    #[must_use]
    pub fn peer(&self) -> &Peer {
        &self.peer
    }
}

impl ChannelHandle for TelegramChannel {
    fn dialog_id(&self) -> i64 {
        self.dialog_id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// API hash used when requesting login codes.
    api_hash: String,

    /// Raw updates, taken once by [`Subscribe::subscribe`].
    updates: Mutex<Option<RawUpdatesReceiver>>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram using the session stored at `session_file`.
    ///
    /// The file is created when missing; the sign-in state written by a
    /// successful login is reused by later runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened or the connection
    /// fails.
    pub async fn connect(
        config: &TelegramConfig,
        session_file: &Path,
    ) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(session_file)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        Ok(Self {
            client,
            handle: handle.thin,
            api_hash: config.api_hash.clone(),
            updates: Mutex::new(Some(updates)),
            _pool_task: pool_task,
        })
    }

    /// Finds a channel among the account's dialogs by numeric id.
    async fn find_dialog(&self, reference: &ChannelRef) -> Result<TelegramChannel, TelegramError> {
        let mut dialogs = self.client.iter_dialogs();

        while let Some(dialog) = dialogs.next().await? {
            let dialog_id = dialog.peer().id().bot_api_dialog_id();
            let bare_id = ChannelRef::unmarked_channel_id(dialog_id).unwrap_or(dialog_id.abs());
            if reference.matches_id(dialog_id, bare_id) {
                return Ok(TelegramChannel::from_peer(dialog.peer().clone()));
            }
        }

        Err(TelegramError::NotFound(format!(
            "{reference} (not among this account's dialogs)"
        )))
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

#[async_trait]
impl LoginApi for TelegramBot {
    type LoginToken = LoginToken;
    type PasswordToken = PasswordToken;

    async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    async fn request_login_code(&self, phone: &str) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, &self.api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    async fn sign_in(
        &self,
        token: &LoginToken,
        code: &str,
    ) -> Result<SignInStep<PasswordToken>, TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(user) => Ok(SignInStep::Done(account_from_user(&user))),
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                let hint = password_token.hint().map(str::to_owned);
                Ok(SignInStep::PasswordRequired {
                    token: password_token,
                    hint,
                })
            }
            Err(SignInError::InvalidCode) => Err(TelegramError::InvalidCode),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<Account, TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(user) => Ok(account_from_user(&user)),
            Err(SignInError::InvalidPassword(_)) => Err(TelegramError::InvalidPassword),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    async fn get_me(&self) -> Result<Account, TelegramError> {
        let me = self.client.get_me().await?;
        Ok(account_from_user(&me))
    }
}

#[async_trait]
impl ChannelGateway for TelegramBot {
    type Channel = TelegramChannel;
    type Media = Media;

    async fn resolve_channel(&self, reference: &ChannelRef) -> Result<TelegramChannel, TelegramError> {
        match reference {
            ChannelRef::Username(username) => self
                .client
                .resolve_username(username)
                .await?
                .map(TelegramChannel::from_peer)
                .ok_or_else(|| TelegramError::NotFound(reference.to_string())),
            ChannelRef::Id(_) => self.find_dialog(reference).await,
        }
    }

    async fn send_copy(
        &self,
        target: &TelegramChannel,
        post: &IncomingPost<Media>,
    ) -> Result<(), TelegramError> {
        debug!(
            "Sending copy of post {} to {}: \"{}\"",
            post.id,
            target.title(),
            truncate_for_log(&post.text, 30)
        );

        let mut message = InputMessage::new().html(&post.text);
        if let Some(media) = &post.media {
            message = message.copy_media(media);
        }

        self.client.send_message(target.peer(), message).await?;
        Ok(())
    }
}

#[async_trait]
impl Subscribe for TelegramBot {
    type Posts = TelegramPostStream;

    /// Starts streaming new posts.
    ///
    /// Updates have been buffering since `connect`; messages dated before
    /// this call are skipped by the returned stream rather than copied late.
    async fn subscribe(&self) -> Result<TelegramPostStream, TelegramError> {
        let updates = self
            .updates
            .lock()
            .await
            .take()
            .ok_or_else(|| TelegramError::Connection("Update stream already in use".to_owned()))?;

        let opened_at = Utc::now();
        let stream = self
            .client
            .stream_updates(
                updates,
                UpdatesConfiguration {
                    catch_up: false,
                    ..Default::default()
                },
            )
            .await;

        Ok(TelegramPostStream {
            updates: stream,
            opened_at,
        })
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

/// New posts read from the Telegram update stream.
pub struct TelegramPostStream {
    updates: UpdateStream,

    /// Messages dated before this are stale.
    opened_at: DateTime<Utc>,
}

#[async_trait]
impl PostStream for TelegramPostStream {
    type Media = Media;

    async fn next_post(&mut self) -> Result<Option<IncomingPost<Media>>, TelegramError> {
        loop {
            if let Update::NewMessage(message) = self.updates.next().await? {
                if is_stale(message.date(), self.opened_at) {
                    debug!(
                        "Skipping message {} sent before copying started",
                        message.id()
                    );
                    continue;
                }
                return Ok(Some(post_from_message(&message)));
            }
        }
    }
}

impl std::fmt::Debug for TelegramPostStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramPostStream").finish_non_exhaustive()
    }
}

/// Converts a received message into a post.
///
/// Link previews are not copied as media; the target regenerates them from
/// the text.
fn post_from_message(message: &Message) -> IncomingPost<Media> {
    let media = message
        .media()
        .filter(|media| !matches!(media, Media::WebPage(_)));

    IncomingPost::new(
        message.id(),
        message.peer_id().bot_api_dialog_id(),
        message.html_text(),
        media,
    )
}

/// Whether a message sent at `sent` predates the stream opened at
/// `opened_at`. Telegram dates have one-second resolution, so a message from
/// the same second is kept.
fn is_stale(sent: DateTime<Utc>, opened_at: DateTime<Utc>) -> bool {
    sent.timestamp() < opened_at.timestamp()
}

fn account_from_user(user: &grammers_client::peer::User) -> Account {
    Account {
        id: user.id().bare_id(),
        name: user.full_name(),
        username: user.username().map(str::to_owned),
    }
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}

/// Truncates a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
