use async_trait::async_trait;

use crate::domain::events::{Envelope, EventPayload, Payload};
use crate::error::AppError;
use crate::pipeline::interceptor::{Interceptor, Next};

/// Parses raw JSON payloads into [`EventPayload`].
///
/// A payload that does not parse ends processing of the envelope with
/// [`AppError::Decode`]; the rest of the chain never sees it.
pub struct DecodeInterceptor;

#[async_trait]
impl Interceptor for DecodeInterceptor {
    async fn process(&self, envelope: Envelope, next: Next<'_>) -> Result<(), AppError> {
        let decoded = match &envelope.payload {
            Payload::Decoded(_) => return next.run(envelope).await,
            Payload::Raw(bytes) => serde_json::from_slice::<EventPayload>(bytes).map_err(|e| {
                AppError::Decode {
                    topic: envelope.topic.clone(),
                    reason: e.to_string(),
                }
            })?,
        };

        next.run(envelope.with_payload(Payload::Decoded(decoded)))
            .await
    }
}
