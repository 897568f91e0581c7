//! Telegram client wrapper module.
//!
//! Provides the `MTProto` connection, sign-in steps, channel lookup and
//! message copying used by the rest of the bot.

mod channel;
mod client;

pub use channel::{ChannelRef, ChannelRefError};
pub use client::{TelegramBot, TelegramChannel, TelegramError, TelegramPostStream};
