//! Cached redirect snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};

use super::short_link::{ShortLink, expiry_deadline};

/// Point-in-time copy of a [`ShortLink`] kept in the cache store.
///
/// `budget` is a snapshot taken when the entry was written; it never exceeds
/// the durable budget at that moment. The durable record stays authoritative.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub budget: Option<u32>,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub created_at: DateTime<Utc>,
    pub ttl_hours: Option<u32>,
}

impl CacheEntry {
    /// Snapshots the link as it is right now.
    pub fn from_link(link: &ShortLink) -> Self {
        Self {
            url: link.url.clone(),
            budget: link.remaining_redirects,
            created_at: link.created_at,
            ttl_hours: link.ttl_hours,
        }
    }

    /// Returns a copy with a different budget snapshot.
    pub fn with_budget(&self, budget: u32) -> Self {
        Self {
            budget: Some(budget),
            ..self.clone()
        }
    }

    /// Link expiry deadline carried by the snapshot.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        expiry_deadline(self.created_at, self.ttl_hours)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|deadline| deadline <= now)
    }

    /// Rebuilds the link snapshot that read events carry on cache hits.
    pub fn to_link(&self, code: &str) -> ShortLink {
        ShortLink::new(
            code.to_string(),
            self.url.clone(),
            self.budget,
            self.ttl_hours,
            self.created_at,
        )
    }
}
