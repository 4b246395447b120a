//! Durable budget and last-visit accounting for `read` events.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::domain::events::{Envelope, EventAction};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::pipeline::Handler;

/// Applies each `read` event to the durable record.
///
/// Every processed event decrements a set budget by one, in whatever order
/// events arrive. Only `last_visit_at` is order sensitive: it moves forward
/// to the event timestamp and never back.
pub struct VisitHandler<L: LinkRepository> {
    links: Arc<L>,
}

impl<L: LinkRepository> VisitHandler<L> {
    pub fn new(links: Arc<L>) -> Self {
        Self { links }
    }
}

#[async_trait]
impl<L: LinkRepository + 'static> Handler for VisitHandler<L> {
    fn name(&self) -> &str {
        "visit_handler"
    }

    async fn handle(&self, envelope: &Envelope) -> Result<(), AppError> {
        let event = envelope.lifecycle_event()?;
        if event.action != EventAction::Read {
            debug!(topic = %envelope.topic, "visit handler ignores non-read event");
            return Ok(());
        }

        let code = &event.link().code;
        let updated = self
            .links
            .record_visit(code, event.emitted_at)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

        debug!(
            code = %updated.code,
            remaining = ?updated.remaining_redirects,
            last_visit_at = ?updated.last_visit_at,
            "visit recorded"
        );
        Ok(())
    }
}
