//! Aggregated usage counters per target URL and per host.

use serde::Serialize;

use crate::domain::events::EventAction;

/// Cumulative counters for one exact target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMetric {
    pub id: i64,
    pub url: String,
    pub redirect_count: i64,
    pub creation_count: i64,
}

/// Cumulative counters for one normalized host.
///
/// `path_ids` references the [`PathMetric`]s seen under this host. It is a
/// back-reference set that only grows; path metrics live independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostMetric {
    pub id: i64,
    pub host: String,
    pub redirect_count: i64,
    pub creation_count: i64,
    pub path_ids: Vec<i64>,
}

/// Amount added to each counter by a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub redirects: i64,
    pub creations: i64,
}

impl CounterDelta {
    /// `read` events count a redirect, `create` events count a creation.
    pub fn for_action(action: EventAction) -> Self {
        match action {
            EventAction::Read => Self {
                redirects: 1,
                creations: 0,
            },
            EventAction::Create => Self {
                redirects: 0,
                creations: 1,
            },
        }
    }
}

/// Result of a path upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathUpsert {
    pub metric: PathMetric,
    /// True when this upsert created the row.
    pub inserted: bool,
}
