use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::info;

use crate::domain::events::Envelope;
use crate::error::AppError;
use crate::pipeline::interceptor::{Interceptor, Next};

/// Unit used when logging envelope durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingUnit {
    #[default]
    Seconds,
    Millis,
    Nanos,
}

impl TimingUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            TimingUnit::Seconds => "s",
            TimingUnit::Millis => "ms",
            TimingUnit::Nanos => "ns",
        }
    }

    /// Renders `elapsed` in this unit, e.g. `12.345ms`.
    pub fn format(&self, elapsed: Duration) -> String {
        match self {
            TimingUnit::Seconds => format!("{:.6}s", elapsed.as_secs_f64()),
            TimingUnit::Millis => format!("{:.3}ms", elapsed.as_secs_f64() * 1_000.0),
            TimingUnit::Nanos => format!("{}ns", elapsed.as_nanos()),
        }
    }
}

impl fmt::Display for TimingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimingUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "seconds" => Ok(TimingUnit::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(TimingUnit::Millis),
            "ns" | "nanos" | "nanoseconds" => Ok(TimingUnit::Nanos),
            other => Err(format!(
                "unknown timing unit '{}', expected one of: s, ms, ns",
                other
            )),
        }
    }
}

/// Measures wall-clock time spent in the rest of the chain.
///
/// The duration is logged and recorded in the
/// `pipeline_envelope_duration_seconds` histogram whether or not the
/// remaining stages succeed.
pub struct TimingInterceptor {
    unit: TimingUnit,
}

impl TimingInterceptor {
    pub fn new(unit: TimingUnit) -> Self {
        Self { unit }
    }
}

#[async_trait]
impl Interceptor for TimingInterceptor {
    async fn process(&self, envelope: Envelope, next: Next<'_>) -> Result<(), AppError> {
        let topic = envelope.topic.clone();
        let start = Instant::now();

        let result = next.run(envelope).await;

        let elapsed = start.elapsed();
        metrics::histogram!("pipeline_envelope_duration_seconds", "topic" => topic.clone())
            .record(elapsed.as_secs_f64());
        info!(
            topic = %topic,
            duration = %self.unit.format(elapsed),
            ok = result.is_ok(),
            "envelope handled"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!("s".parse::<TimingUnit>().unwrap(), TimingUnit::Seconds);
        assert_eq!("MS".parse::<TimingUnit>().unwrap(), TimingUnit::Millis);
        assert_eq!(" ns ".parse::<TimingUnit>().unwrap(), TimingUnit::Nanos);
        assert!("fortnights".parse::<TimingUnit>().is_err());
    }

    #[test]
    fn test_format_durations() {
        let elapsed = Duration::from_micros(12_345);

        assert_eq!(TimingUnit::Seconds.format(elapsed), "0.012345s");
        assert_eq!(TimingUnit::Millis.format(elapsed), "12.345ms");
        assert_eq!(TimingUnit::Nanos.format(elapsed), "12345000ns");
        assert_eq!(TimingUnit::Millis.to_string(), "ms");
    }
}
