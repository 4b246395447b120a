//! Event bus adapters.
//!
//! The bus carries lifecycle events between the redirect path and the
//! consumer pipeline. Two adapters are provided:
//! - [`RedisStreamsPublisher`] / [`RedisStreamsSource`] - one Redis stream per topic
//! - [`ChannelPublisher`] / [`ChannelSource`] - in-process `tokio::sync::mpsc` channel
//!
//! Delivery is at-least-once; consumers must tolerate duplicates.

mod channel;
mod redis_streams;

pub use channel::{ChannelPublisher, ChannelSource, channel};
pub use redis_streams::{
    RedisStreamsPublisher, RedisStreamsSource, StreamSubscription, stream_key,
};

use async_trait::async_trait;

use crate::domain::events::RawMessage;
use crate::error::AppError;

/// Producer side of the bus.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Appends `payload` to `topic`, keyed by `key`.
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), AppError>;
}

/// Consumer side of the bus.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next message.
    ///
    /// Returns `Ok(None)` once the source is closed and fully drained.
    async fn next(&mut self) -> Result<Option<RawMessage>, AppError>;
}
