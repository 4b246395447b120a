//! Standard interceptors.
//!
//! The consumer installs them outermost first:
//!
//! 1. [`DecodeInterceptor`] - parses the raw payload; malformed input stops the chain with an error
//! 2. [`FaultIsolationInterceptor`] - contains any failure from the stages below
//! 3. [`TimingInterceptor`] - measures the rest of the chain
//! 4. [`LoggingInterceptor`] - logs topic and payload
//!
//! Dispatch to handlers follows as the terminal stage.

mod decode;
mod fault_isolation;
mod logging;
mod timing;

pub use decode::DecodeInterceptor;
pub use fault_isolation::FaultIsolationInterceptor;
pub use logging::LoggingInterceptor;
pub use timing::{TimingInterceptor, TimingUnit};

use std::sync::Arc;

use super::interceptor::Interceptor;

/// Builds the standard chain in its required order.
pub fn standard_chain(unit: TimingUnit) -> Vec<Arc<dyn Interceptor>> {
    vec![
        Arc::new(DecodeInterceptor),
        Arc::new(FaultIsolationInterceptor),
        Arc::new(TimingInterceptor::new(unit)),
        Arc::new(LoggingInterceptor),
    ]
}
