//! Channel Copy Bot Library
//!
//! A Telegram userbot that copies new posts from one channel to another.
//!
//! This crate provides the core functionality for:
//! - Loading and persisting the per-session copy configuration
//! - Signing in to Telegram via `MTProto` and reusing the stored session
//! - Resolving channels by id or username
//! - Republishing new source posts to the target after a delay

pub mod config;
pub mod forward;
pub mod runner;
pub mod session;
pub mod setup;
pub mod telegram;
