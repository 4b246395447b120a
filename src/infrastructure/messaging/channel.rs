//! In-process bus backed by a bounded channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use super::{EventPublisher, EventSource};
use crate::domain::events::RawMessage;
use crate::error::AppError;

/// Creates a connected publisher/source pair.
///
/// The publisher is cheap to clone. The source yields messages in publish
/// order and ends once every publisher has been dropped.
pub fn channel(capacity: usize) -> (ChannelPublisher, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        ChannelPublisher {
            tx,
            offset: Arc::new(AtomicU64::new(0)),
        },
        ChannelSource { rx },
    )
}

#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<RawMessage>,
    offset: Arc<AtomicU64>,
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), AppError> {
        let offset = self.offset.fetch_add(1, Ordering::Relaxed);
        let message = RawMessage {
            topic: topic.to_string(),
            key: Some(key.to_string()),
            timestamp: Utc::now(),
            partition: 0,
            offset: offset.to_string(),
            payload,
        };

        self.tx
            .send(message)
            .await
            .map_err(|_| AppError::Messaging("channel closed".to_string()))
    }
}

pub struct ChannelSource {
    rx: mpsc::Receiver<RawMessage>,
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next(&mut self) -> Result<Option<RawMessage>, AppError> {
        Ok(self.rx.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_arrive_in_order_with_offsets() {
        let (publisher, mut source) = channel(8);

        publisher.publish("URL.create", "a", b"1".to_vec()).await.unwrap();
        publisher.publish("URL.read", "a", b"2".to_vec()).await.unwrap();
        drop(publisher);

        let first = source.next().await.unwrap().unwrap();
        let second = source.next().await.unwrap().unwrap();

        assert_eq!(first.topic, "URL.create");
        assert_eq!(first.offset, "0");
        assert_eq!(second.offset, "1");
        assert_eq!(second.key.as_deref(), Some("a"));
        assert!(source.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_after_source_dropped_fails() {
        let (publisher, source) = channel(1);
        drop(source);

        let err = publisher.publish("URL.read", "a", Vec::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Messaging(_)));
    }
}
