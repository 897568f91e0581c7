//! In-memory gateway for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{ChannelGateway, ChannelHandle, IncomingPost};
use crate::telegram::{ChannelRef, TelegramError};

#[derive(Debug, Clone)]
pub struct FakeChannel {
    pub id: i64,
    pub title: String,
}

impl ChannelHandle for FakeChannel {
    fn dialog_id(&self) -> i64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone)]
pub struct SentCopy {
    pub target: i64,
    pub text: String,
    pub media: Option<String>,
    pub at: Instant,
}

#[derive(Debug, Default)]
pub struct FakeGateway {
    channels: HashMap<String, FakeChannel>,
    resolve_calls: AtomicUsize,
    failing_resolves: AtomicUsize,
    failing_sends: AtomicUsize,
    sent: Mutex<Vec<SentCopy>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, username: &str, id: i64, title: &str) -> Self {
        self.channels.insert(
            username.to_owned(),
            FakeChannel {
                id,
                title: title.to_owned(),
            },
        );
        self
    }

    /// Makes the next `n` lookups fail.
    pub fn fail_resolves(&self, n: usize) {
        self.failing_resolves.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` sends fail.
    pub fn fail_sends(&self, n: usize) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentCopy> {
        self.sent.lock().unwrap().clone()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ChannelGateway for FakeGateway {
    type Channel = FakeChannel;
    type Media = String;

    async fn resolve_channel(&self, reference: &ChannelRef) -> Result<FakeChannel, TelegramError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_resolves) {
            return Err(TelegramError::Connection("simulated outage".to_owned()));
        }

        let found = match reference {
            ChannelRef::Username(name) => self.channels.get(name),
            ChannelRef::Id(_) => self
                .channels
                .values()
                .find(|c| reference.matches_id(c.id, c.id)),
        };
        found
            .cloned()
            .ok_or_else(|| TelegramError::NotFound(reference.to_string()))
    }

    async fn send_copy(
        &self,
        target: &FakeChannel,
        post: &IncomingPost<String>,
    ) -> Result<(), TelegramError> {
        if Self::take_failure(&self.failing_sends) {
            return Err(TelegramError::Invocation("simulated send failure".to_owned()));
        }

        self.sent.lock().unwrap().push(SentCopy {
            target: target.id,
            text: post.text.clone(),
            media: post.media.clone(),
            at: Instant::now(),
        });
        Ok(())
    }
}
