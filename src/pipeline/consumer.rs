//! Consumer runtime: reads the bus and drives envelopes through the chain.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use super::interceptor::{Interceptor, Next};
use super::interceptors::{TimingUnit, standard_chain};
use super::registry::HandlerRegistry;
use crate::domain::events::{Envelope, RawMessage};
use crate::error::AppError;
use crate::infrastructure::messaging::EventSource;

/// Processes messages strictly one after another.
///
/// Handlers of a single envelope run concurrently (see
/// [`HandlerRegistry::dispatch`]), but the next envelope is only read once
/// the current one is finished.
pub struct Consumer {
    chain: Vec<Arc<dyn Interceptor>>,
    registry: HandlerRegistry,
}

impl Consumer {
    pub fn new(chain: Vec<Arc<dyn Interceptor>>, registry: HandlerRegistry) -> Self {
        Self { chain, registry }
    }

    /// Consumer with the standard interceptor chain.
    pub fn standard(registry: HandlerRegistry, unit: TimingUnit) -> Self {
        Self::new(standard_chain(unit), registry)
    }

    /// Topics the consumer has handlers for.
    pub fn topics(&self) -> Vec<String> {
        self.registry.topics()
    }

    /// Runs one message through the chain.
    ///
    /// # Errors
    ///
    /// Returns whatever escapes the chain. With the standard chain that is
    /// only [`AppError::Decode`].
    pub async fn process(&self, raw: RawMessage) -> Result<(), AppError> {
        Next::new(&self.chain, &self.registry)
            .run(Envelope::from_raw(raw))
            .await
    }

    /// Consumes `source` until it closes.
    pub async fn run(&self, source: &mut dyn EventSource) -> Result<u64, AppError> {
        self.run_until(source, std::future::pending()).await
    }

    /// Consumes `source` until it closes or `shutdown` resolves.
    ///
    /// Shutdown is only observed between envelopes; an envelope already being
    /// processed always finishes. Returns the number of messages taken from
    /// the source.
    ///
    /// # Errors
    ///
    /// Returns the source error if reading fails after its own retries.
    pub async fn run_until<F>(
        &self,
        source: &mut dyn EventSource,
        shutdown: F,
    ) -> Result<u64, AppError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut consumed = 0u64;

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    info!(consumed, "Shutdown requested, consumer stopping");
                    break;
                }
                next = source.next() => next?,
            };

            let Some(raw) = next else {
                info!(consumed, "Event source closed");
                break;
            };

            consumed += 1;
            let topic = raw.topic.clone();
            let offset = raw.offset.clone();
            metrics::counter!("pipeline_envelopes_total", "topic" => topic.clone()).increment(1);

            if let Err(e) = self.process(raw).await {
                warn!(topic = %topic, offset = %offset, error = %e, "envelope dropped");
                metrics::counter!("pipeline_envelopes_dropped_total", "topic" => topic)
                    .increment(1);
            }
        }

        Ok(consumed)
    }
}
