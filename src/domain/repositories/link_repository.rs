//! Repository trait for durable short link records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::ShortLink;
use crate::error::AppError;

/// Durable store of [`ShortLink`] records.
///
/// Every method is atomic at single-record granularity; no in-process locking
/// is layered on top.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL
/// - [`crate::infrastructure::persistence::InMemoryLinkRepository`] - in-process map
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the code is already taken.
    async fn insert(&self, link: &ShortLink) -> Result<ShortLink, AppError>;

    /// Finds a link by its short code.
    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError>;

    /// Applies one visit to the link in a single find-and-modify step.
    ///
    /// - `last_visit_at` becomes `visited_at` only if that moves it forward
    ///   (or it was unset); older visits never move it back.
    /// - A set budget of at least 1 is decremented by one on every call,
    ///   whatever the timestamp order.
    ///
    /// Returns the updated record, or `None` if the code is unknown.
    async fn record_visit(
        &self,
        code: &str,
        visited_at: DateTime<Utc>,
    ) -> Result<Option<ShortLink>, AppError>;
}
