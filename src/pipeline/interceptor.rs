//! Interceptor chain primitives.

use async_trait::async_trait;
use std::sync::Arc;

use super::registry::HandlerRegistry;
use crate::domain::events::Envelope;
use crate::error::AppError;

/// One stage of the processing chain.
///
/// An interceptor receives the envelope together with the rest of the chain
/// as [`Next`]. It may transform the envelope before calling
/// [`Next::run`], pass it through unchanged, stop the chain by not calling
/// `next` at all, or wrap the call to observe or contain its outcome.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn process(&self, envelope: Envelope, next: Next<'_>) -> Result<(), AppError>;
}

/// Continuation over the remaining interceptors.
///
/// When no interceptor is left, running the continuation dispatches the
/// envelope to the registered handlers.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn Interceptor>],
    dispatcher: &'a HandlerRegistry,
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Interceptor>], dispatcher: &'a HandlerRegistry) -> Self {
        Self {
            rest: chain,
            dispatcher,
        }
    }

    /// Invokes the next interceptor, or the dispatcher at the end of the chain.
    pub async fn run(self, envelope: Envelope) -> Result<(), AppError> {
        match self.rest.split_first() {
            Some((first, rest)) => {
                first
                    .process(
                        envelope,
                        Next {
                            rest,
                            dispatcher: self.dispatcher,
                        },
                    )
                    .await
            }
            None => self.dispatcher.dispatch(envelope).await,
        }
    }
}
