//! Lifecycle events emitted when a short link is created or resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::domain::entities::ShortLink;
use crate::error::AppError;

/// Entity kind used as the first segment of every topic name.
pub const ENTITY_KIND: &str = "URL";

/// What happened to the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventAction {
    Create,
    Read,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Create => "create",
            EventAction::Read => "read",
        }
    }

    /// Topic name in the `<EntityKind>.<action>` form, e.g. `URL.read`.
    pub fn topic(&self) -> String {
        format!("{}.{}", ENTITY_KIND, self.as_str())
    }

    /// Parses the action out of a topic name.
    ///
    /// Only the suffix after the last `.` is considered, so any entity kind
    /// is accepted.
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic.rsplit_once('.')?.1 {
            "create" => Some(EventAction::Create),
            "read" => Some(EventAction::Read),
            _ => None,
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire payload: the serialized link plus optional side-channel fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(flatten)]
    pub link: ShortLink,
    /// Budget the emitter observed when the event was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_at_emit: Option<u32>,
    /// Client address, passed through for enrichment consumers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Client user agent, passed through for enrichment consumers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl EventPayload {
    pub fn new(link: ShortLink) -> Self {
        Self {
            link,
            budget_at_emit: None,
            ip_address: None,
            user_agent: None,
        }
    }
}

/// A decoded `create` or `read` event.
///
/// Events are immutable once emitted and may be delivered more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub action: EventAction,
    /// Bus timestamp of the message carrying the event.
    pub emitted_at: DateTime<Utc>,
    pub payload: EventPayload,
}

impl LifecycleEvent {
    pub fn created(link: ShortLink) -> Self {
        let budget = link.remaining_redirects;
        Self {
            action: EventAction::Create,
            emitted_at: Utc::now(),
            payload: EventPayload {
                budget_at_emit: budget,
                ..EventPayload::new(link)
            },
        }
    }

    pub fn read(link: ShortLink, budget_at_emit: Option<u32>) -> Self {
        Self {
            action: EventAction::Read,
            emitted_at: Utc::now(),
            payload: EventPayload {
                budget_at_emit,
                ..EventPayload::new(link)
            },
        }
    }

    pub fn link(&self) -> &ShortLink {
        &self.payload.link
    }

    pub fn topic(&self) -> String {
        self.action.topic()
    }

    /// Partition key used when publishing: the short code.
    pub fn key(&self) -> &str {
        &self.payload.link.code
    }

    /// Serializes the payload for the bus.
    pub fn encode(&self) -> Result<Vec<u8>, AppError> {
        serde_json::to_vec(&self.payload).map_err(|e| {
            AppError::internal(
                "Failed to encode event payload",
                json!({ "topic": self.topic(), "reason": e.to_string() }),
            )
        })
    }
}
