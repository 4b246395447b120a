//! Topic to handler registry and concurrent fan-out dispatch.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::domain::events::Envelope;
use crate::error::AppError;

/// Business logic subscribed to a topic.
///
/// Handlers receive a fully decoded envelope. Handlers registered on the same
/// topic run concurrently and in no particular order.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used when reporting failures.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, envelope: &Envelope) -> Result<(), AppError>;
}

/// Registry of handlers per topic; the terminal stage of the chain.
///
/// Built once at startup and owned by the consumer.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handler` to the handlers of `topic`.
    pub fn register(&mut self, topic: impl Into<String>, handler: Arc<dyn Handler>) -> &mut Self {
        self.handlers.entry(topic.into()).or_default().push(handler);
        self
    }

    /// Topics with at least one handler, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .handlers
            .iter()
            .filter(|(_, handlers)| !handlers.is_empty())
            .map(|(topic, _)| topic.clone())
            .collect();
        topics.sort();
        topics
    }

    pub fn handler_count(&self, topic: &str) -> usize {
        self.handlers.get(topic).map_or(0, Vec::len)
    }

    /// Runs every handler registered for the envelope's topic.
    ///
    /// All handlers are spawned at once and awaited to completion, so one
    /// failing or panicking handler never cancels its siblings. Failures are
    /// collected into a single [`AppError::HandlerFailures`].
    pub async fn dispatch(&self, envelope: Envelope) -> Result<(), AppError> {
        let handlers = match self.handlers.get(&envelope.topic) {
            Some(handlers) if !handlers.is_empty() => handlers,
            _ => {
                debug!(topic = %envelope.topic, "no handlers registered");
                return Ok(());
            }
        };

        let topic = envelope.topic.clone();
        let envelope = Arc::new(envelope);
        let mut tasks = JoinSet::new();

        for handler in handlers {
            let handler = Arc::clone(handler);
            let envelope = Arc::clone(&envelope);
            tasks.spawn(async move {
                handler
                    .handle(&envelope)
                    .await
                    .map_err(|e| format!("{}: {}", handler.name(), e))
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => failures.push(failure),
                Err(e) => failures.push(format!("handler task aborted: {}", e)),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AppError::HandlerFailures { topic, failures })
        }
    }
}
