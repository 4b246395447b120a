use async_trait::async_trait;
use tracing::info;

use crate::domain::events::Envelope;
use crate::error::AppError;
use crate::pipeline::interceptor::{Interceptor, Next};

/// Logs every envelope before it reaches the handlers.
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn process(&self, envelope: Envelope, next: Next<'_>) -> Result<(), AppError> {
        info!(
            topic = %envelope.topic,
            key = envelope.key.as_deref().unwrap_or("-"),
            offset = %envelope.offset,
            payload = %envelope.payload,
            "envelope received"
        );

        next.run(envelope).await
    }
}
