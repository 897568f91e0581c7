//! Channel copy engine.
//!
//! Watches the source channel for new posts and republishes each one to the
//! target channel after the configured delay.

mod engine;
mod port;
mod resolver;

#[cfg(test)]
mod testing;

pub use engine::{EngineState, ForwardEngine, ForwardError, StopReason};
pub use port::{ChannelGateway, ChannelHandle, IncomingPost, PostStream, Subscribe};
pub use resolver::resolve;
