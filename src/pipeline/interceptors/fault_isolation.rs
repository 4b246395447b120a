use async_trait::async_trait;
use tracing::error;

use crate::domain::events::Envelope;
use crate::error::AppError;
use crate::pipeline::interceptor::{Interceptor, Next};

/// Contains failures of the remaining chain.
///
/// Errors are logged with the topic and counted, and the envelope is
/// reported as processed. Nothing is redelivered from here.
pub struct FaultIsolationInterceptor;

#[async_trait]
impl Interceptor for FaultIsolationInterceptor {
    async fn process(&self, envelope: Envelope, next: Next<'_>) -> Result<(), AppError> {
        let topic = envelope.topic.clone();
        let offset = envelope.offset.clone();

        if let Err(e) = next.run(envelope).await {
            error!(topic = %topic, offset = %offset, code = e.code(), error = %e, "envelope processing failed");
            metrics::counter!("pipeline_envelope_failures_total", "topic" => topic).increment(1);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::RawMessage;
    use crate::pipeline::registry::{Handler, HandlerRegistry};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    struct Failing;

    #[async_trait]
    impl Handler for Failing {
        async fn handle(&self, _envelope: &Envelope) -> Result<(), AppError> {
            Err(AppError::internal("store unavailable", json!({})))
        }
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let mut registry = HandlerRegistry::new();
        registry.register("URL.read", Arc::new(Failing));
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(FaultIsolationInterceptor)];
        let envelope = Envelope::from_raw(RawMessage {
            topic: "URL.read".into(),
            key: None,
            timestamp: Utc::now(),
            partition: 0,
            offset: "0".into(),
            payload: Vec::new(),
        });

        let result = Next::new(&chain, &registry).run(envelope).await;

        assert!(result.is_ok());
    }
}
