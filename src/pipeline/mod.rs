//! Event processing pipeline.
//!
//! Every inbound message is wrapped in an [`Envelope`](crate::domain::events::Envelope)
//! and passed through an ordered chain of [`Interceptor`]s. The last stage is
//! the [`HandlerRegistry`], which fans the envelope out to every [`Handler`]
//! registered for its topic.
//!
//! ```text
//! source -> Decode -> FaultIsolation -> Timing -> Logging -> dispatch -> handlers
//! ```

pub mod consumer;
pub mod interceptor;
pub mod interceptors;
pub mod registry;

pub use consumer::Consumer;
pub use interceptor::{Interceptor, Next};
pub use interceptors::{
    DecodeInterceptor, FaultIsolationInterceptor, LoggingInterceptor, TimingInterceptor,
    TimingUnit, standard_chain,
};
pub use registry::{Handler, HandlerRegistry};
