//! Short link entity: the durable record behind every redirect.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};

/// A shortened URL with its usage budget and lifetime.
///
/// `remaining_redirects` is the budget: `None` means unlimited, `Some(0)`
/// means the link is permanently inactive. The budget only ever decreases.
///
/// Expiry is never stored; it is derived from `created_at` and `ttl_hours`
/// on demand (see [`ShortLink::is_expired_at`]).
///
/// Timestamps serialize as epoch milliseconds so the record travels unchanged
/// through event payloads.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub code: String,
    pub url: String,
    pub remaining_redirects: Option<u32>,
    pub ttl_hours: Option<u32>,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub created_at: DateTime<Utc>,
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    pub last_visit_at: Option<DateTime<Utc>>,
}

impl ShortLink {
    /// Creates a link that has never been visited.
    pub fn new(
        code: String,
        url: String,
        remaining_redirects: Option<u32>,
        ttl_hours: Option<u32>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            url,
            remaining_redirects,
            ttl_hours,
            created_at,
            last_visit_at: None,
        }
    }

    /// Instant after which the link stops resolving, if it has a TTL.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        expiry_deadline(self.created_at, self.ttl_hours)
    }

    /// Returns true if the TTL has elapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|deadline| deadline <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true once the redirect budget has been used up.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_redirects == Some(0)
    }

    /// A link resolves only while it is neither exhausted nor expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_exhausted() && !self.is_expired_at(now)
    }
}

/// A TTL reaching past the last representable instant never expires.
pub(crate) fn expiry_deadline(
    created_at: DateTime<Utc>,
    ttl_hours: Option<u32>,
) -> Option<DateTime<Utc>> {
    ttl_hours.and_then(|hours| {
        created_at.checked_add_signed(Duration::hours(i64::from(hours)))
    })
}

/// Input data for shortening a URL.
#[derive(Debug, Clone, Default)]
pub struct NewShortLink {
    pub url: String,
    pub remaining_redirects: Option<u32>,
    pub ttl_hours: Option<u32>,
    /// Caller-chosen code; a random one is generated when absent.
    pub custom_code: Option<String>,
}

impl NewShortLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_budget(mut self, remaining_redirects: u32) -> Self {
        self.remaining_redirects = Some(remaining_redirects);
        self
    }

    pub fn with_ttl_hours(mut self, ttl_hours: u32) -> Self {
        self.ttl_hours = Some(ttl_hours);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.custom_code = Some(code.into());
        self
    }
}
