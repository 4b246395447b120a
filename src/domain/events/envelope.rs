//! Messages as read from the bus and as seen by the interceptor chain.

use chrono::{DateTime, Utc};
use std::fmt;

use super::lifecycle::{EventAction, EventPayload, LifecycleEvent};
use crate::error::AppError;

/// A message exactly as delivered by the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    pub key: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub partition: i32,
    /// Source-specific position of the message (stream entry id, counter).
    pub offset: String,
    pub payload: Vec<u8>,
}

/// Payload of an [`Envelope`]: still raw bytes, or parsed by the decode stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Raw(Vec<u8>),
    Decoded(EventPayload),
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Raw(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Payload::Decoded(payload) => match serde_json::to_string(payload) {
                Ok(json) => f.write_str(&json),
                Err(_) => write!(f, "{:?}", payload),
            },
        }
    }
}

/// Normalized message flowing through the interceptor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub topic: String,
    pub key: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub partition: i32,
    pub offset: String,
    pub payload: Payload,
}

impl Envelope {
    /// Wraps a raw message without decoding it.
    pub fn from_raw(raw: RawMessage) -> Self {
        Self {
            topic: raw.topic,
            key: raw.key,
            timestamp: raw.timestamp,
            partition: raw.partition,
            offset: raw.offset,
            payload: Payload::Raw(raw.payload),
        }
    }

    /// Returns a copy of the envelope carrying a different payload.
    pub fn with_payload(self, payload: Payload) -> Self {
        Self { payload, ..self }
    }

    /// Decoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Decode`] if the envelope did not pass the decode stage.
    pub fn decoded(&self) -> Result<&EventPayload, AppError> {
        match &self.payload {
            Payload::Decoded(payload) => Ok(payload),
            Payload::Raw(_) => Err(AppError::Decode {
                topic: self.topic.clone(),
                reason: "payload has not been decoded".to_string(),
            }),
        }
    }

    /// Interprets the envelope as a lifecycle event.
    ///
    /// The action comes from the topic suffix and `emitted_at` from the bus
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Decode`] if the payload is still raw or the topic
    /// names no known action.
    pub fn lifecycle_event(&self) -> Result<LifecycleEvent, AppError> {
        let action = EventAction::from_topic(&self.topic).ok_or_else(|| AppError::Decode {
            topic: self.topic.clone(),
            reason: "topic does not name a lifecycle action".to_string(),
        })?;

        Ok(LifecycleEvent {
            action,
            emitted_at: self.timestamp,
            payload: self.decoded()?.clone(),
        })
    }
}
