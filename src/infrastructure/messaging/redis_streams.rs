//! Redis Streams bus adapter.
//!
//! Every topic maps to its own stream `<prefix>:<topic>`. Entries carry two
//! fields: `key` (the short code) and `payload` (the raw event bytes).

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use super::{EventPublisher, EventSource};
use crate::config::Config;
use crate::domain::events::RawMessage;
use crate::error::AppError;

const KEY_FIELD: &str = "key";
const PAYLOAD_FIELD: &str = "payload";
const READ_RETRIES: usize = 5;
const NEW_ENTRIES: &str = ">";
const BACKLOG_START: &str = "0";

/// Name of the stream holding `topic`.
pub fn stream_key(prefix: &str, topic: &str) -> String {
    format!("{}:{}", prefix, topic)
}

async fn connect_manager(redis_url: &str) -> Result<ConnectionManager, AppError> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;
    Ok(manager)
}

/// Appends events to per-topic streams with `XADD`.
#[derive(Clone)]
pub struct RedisStreamsPublisher {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStreamsPublisher {
    pub async fn connect(redis_url: &str, prefix: impl Into<String>) -> Result<Self, AppError> {
        let conn = connect_manager(redis_url).await?;
        Ok(Self::from_manager(conn, prefix))
    }

    pub fn from_manager(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for RedisStreamsPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), AppError> {
        let stream = stream_key(&self.prefix, topic);
        let mut conn = self.conn.clone();

        let id: String = conn
            .xadd(
                &stream,
                "*",
                &[
                    (KEY_FIELD, key.as_bytes()),
                    (PAYLOAD_FIELD, payload.as_slice()),
                ],
            )
            .await?;

        debug!(stream = %stream, id = %id, "event published");
        Ok(())
    }
}

/// Where and how a [`RedisStreamsSource`] reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSubscription {
    /// Streams are named `<prefix>:<topic>`.
    pub prefix: String,
    /// Consumer group shared by every consumer instance.
    pub group: String,
    /// Name of this instance inside the group.
    pub consumer: String,
    /// Position a newly created group starts from: `$` for new entries only,
    /// `0` to replay the whole stream. Ignored when the group already exists.
    pub start_id: String,
    pub block_ms: usize,
    pub batch_size: usize,
}

impl StreamSubscription {
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefix: config.stream_prefix.clone(),
            group: config.stream_group.clone(),
            consumer: config.consumer_id.clone(),
            start_id: config.stream_start_id.clone(),
            block_ms: config.stream_block_ms,
            batch_size: config.stream_batch_size,
        }
    }
}

/// Reads all subscribed topic streams through a consumer group.
///
/// Every read uses `XREADGROUP`, so an entry appended to any stream is handed
/// out exactly once per group no matter when it arrives. An entry is
/// acknowledged when the following one is requested, which is after the
/// consumer has finished with it. Entries this consumer received but never
/// acknowledged are read again first after a restart.
///
/// Reads that fail are retried with jittered exponential backoff before the
/// error surfaces.
pub struct RedisStreamsSource {
    conn: ConnectionManager,
    subscription: StreamSubscription,
    keys: Vec<String>,
    cursors: Vec<String>,
    buffer: VecDeque<(usize, RawMessage)>,
    unacked: Option<(usize, String)>,
}

impl RedisStreamsSource {
    /// Connects, creates the consumer group on every stream if needed and
    /// subscribes to `topics`.
    pub async fn connect(
        redis_url: &str,
        topics: &[String],
        subscription: StreamSubscription,
    ) -> Result<Self, AppError> {
        let mut conn = connect_manager(redis_url).await?;
        let keys: Vec<String> = topics
            .iter()
            .map(|t| stream_key(&subscription.prefix, t))
            .collect();

        for key in &keys {
            ensure_group(&mut conn, key, &subscription.group, &subscription.start_id).await?;
        }

        info!(
            streams = ?keys,
            group = %subscription.group,
            consumer = %subscription.consumer,
            "Subscribed to event streams"
        );

        Ok(Self {
            conn,
            cursors: vec![BACKLOG_START.to_string(); keys.len()],
            keys,
            subscription,
            buffer: VecDeque::new(),
            unacked: None,
        })
    }

    async fn read_batch(&mut self) -> Result<(), AppError> {
        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(READ_RETRIES);

        let reply: Option<StreamReadReply> = Retry::spawn(strategy, || {
            let mut conn = self.conn.clone();
            let keys = self.keys.clone();
            let ids = self.cursors.clone();
            let options = StreamReadOptions::default()
                .group(&self.subscription.group, &self.subscription.consumer)
                .block(self.subscription.block_ms)
                .count(self.subscription.batch_size);
            async move {
                let result: redis::RedisResult<Option<StreamReadReply>> = conn
                    .xread_options(keys.as_slice(), ids.as_slice(), &options)
                    .await;
                if let Err(e) = &result {
                    warn!(error = %e, "stream read failed");
                }
                result
            }
        })
        .await?;

        let mut last_delivered: Vec<Option<String>> = vec![None; self.keys.len()];
        let mut unreadable = Vec::new();

        for stream in reply.map(|r| r.keys).unwrap_or_default() {
            let Some(position) = self.keys.iter().position(|k| *k == stream.key) else {
                continue;
            };
            let topic = topic_from_key(&self.subscription.prefix, &stream.key).to_string();

            for entry in stream.ids {
                last_delivered[position] = Some(entry.id.clone());
                match to_raw_message(&topic, &entry) {
                    Some(message) => self.buffer.push_back((position, message)),
                    None => {
                        warn!(stream = %stream.key, id = %entry.id, "skipping entry without payload");
                        unreadable.push((position, entry.id.clone()));
                    }
                }
            }
        }

        for (cursor, delivered) in self.cursors.iter_mut().zip(&last_delivered) {
            *cursor = next_cursor(cursor, delivered.as_deref());
        }

        for (position, id) in unreadable {
            self.ack(position, &id).await;
        }

        Ok(())
    }

    async fn ack(&self, position: usize, id: &str) {
        let Some(key) = self.keys.get(position) else {
            return;
        };
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<i64> =
            conn.xack(key, &self.subscription.group, &[id]).await;
        if let Err(e) = result {
            warn!(stream = %key, id, error = %e, "failed to acknowledge entry");
        }
    }
}

#[async_trait]
impl EventSource for RedisStreamsSource {
    async fn next(&mut self) -> Result<Option<RawMessage>, AppError> {
        if let Some((position, id)) = self.unacked.take() {
            self.ack(position, &id).await;
        }

        loop {
            if let Some((position, message)) = self.buffer.pop_front() {
                self.unacked = Some((position, message.offset.clone()));
                return Ok(Some(message));
            }
            self.read_batch().await?;
        }
    }
}

async fn ensure_group(
    conn: &mut ConnectionManager,
    key: &str,
    group: &str,
    start_id: &str,
) -> Result<(), AppError> {
    let created: redis::RedisResult<()> = conn.xgroup_create_mkstream(key, group, start_id).await;
    match created {
        Ok(()) => {
            info!(stream = key, group, start_id, "Consumer group created");
            Ok(())
        }
        Err(e) if e.code() == Some("BUSYGROUP") => {
            debug!(stream = key, group, "Consumer group already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Id to pass for a stream on the next `XREADGROUP`.
///
/// Backlog reads page through this consumer's pending entries, continuing
/// after the last one returned. A backlog page with nothing for the stream
/// switches it to `>`, entries never delivered to the group, where it stays.
fn next_cursor(cursor: &str, last_delivered: Option<&str>) -> String {
    match (cursor, last_delivered) {
        (NEW_ENTRIES, _) | (_, None) => NEW_ENTRIES.to_string(),
        (_, Some(id)) => id.to_string(),
    }
}

fn topic_from_key<'a>(prefix: &str, key: &'a str) -> &'a str {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(key)
}

/// Stream ids are `<millis>-<seq>`; the millisecond part is the append time.
fn entry_timestamp(id: &str) -> DateTime<Utc> {
    id.split('-')
        .next()
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

fn to_raw_message(topic: &str, entry: &StreamId) -> Option<RawMessage> {
    let payload: Vec<u8> = entry.get(PAYLOAD_FIELD)?;
    let key: Option<String> = entry.get(KEY_FIELD);

    Some(RawMessage {
        topic: topic.to_string(),
        key,
        timestamp: entry_timestamp(&entry.id),
        partition: 0,
        offset: entry.id.clone(),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stream_key_round_trip() {
        let key = stream_key("events", "URL.read");
        assert_eq!(key, "events:URL.read");
        assert_eq!(topic_from_key("events", &key), "URL.read");
        assert_eq!(topic_from_key("events", "other"), "other");
    }

    #[test]
    fn test_entry_timestamp_uses_millis_part() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(entry_timestamp("1704110400000-3"), expected);
    }

    #[test]
    fn test_backlog_cursor_follows_pending_entries() {
        assert_eq!(next_cursor("0", Some("1704110400000-3")), "1704110400000-3");
        assert_eq!(
            next_cursor("1704110400000-3", Some("1704110400001-0")),
            "1704110400001-0"
        );
    }

    #[test]
    fn test_empty_backlog_switches_to_new_entries() {
        assert_eq!(next_cursor("0", None), ">");
        assert_eq!(next_cursor("1704110400000-3", None), ">");
    }

    #[test]
    fn test_new_entry_cursor_never_moves() {
        assert_eq!(next_cursor(">", None), ">");
        assert_eq!(next_cursor(">", Some("1704110400000-3")), ">");
    }

    #[test]
    fn test_quiet_stream_keeps_reading_new_entries() {
        // One stream delivers while the other stays silent; neither cursor
        // may fall back to a position that skips entries appended meanwhile.
        let cursors = [">", ">"];
        let delivered = [Some("1704110400000-0"), None];

        let next: Vec<String> = cursors
            .iter()
            .zip(delivered)
            .map(|(cursor, last)| next_cursor(cursor, last))
            .collect();

        assert_eq!(next, vec![">", ">"]);
    }

    #[test]
    fn test_malformed_id_falls_back_to_now() {
        let before = Utc::now();
        assert!(entry_timestamp("garbage") >= before);
    }
}
