//! Metrics seam.
//!
//! The core emits structured events through an injected sink and has no
//! opinion on storage or visualization. `NoopMetricsSink` is the default;
//! `MemoryMetricsSink` records events for tests and diagnostics.

use crate::health::HealthState;
use std::sync::Mutex;

/// Outcome of a single provider attempt, as reported to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    FatalFailure,
    TimedOut,
}

/// Structured events emitted by the cache and fallback subsystems.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    /// A cache read was served from the named tier.
    CacheHit { tier: String },
    /// A cache read missed every tier.
    CacheMiss,
    /// A tier failed and the store degraded around it.
    CacheDegraded { tier: String, reason: String },
    /// A provider attempt finished.
    ProviderAttempt {
        provider: String,
        outcome: AttemptOutcome,
    },
    /// A provider's health state changed.
    HealthTransition {
        provider: String,
        from: HealthState,
        to: HealthState,
    },
}

/// Sink for structured metric events.
///
/// Implementations must be cheap and non-blocking; the engine calls this
/// on the request hot path.
pub trait MetricsSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: MetricEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _event: MetricEvent) {}
}

/// Sink that retains events in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemoryMetricsSink {
    events: Mutex<Vec<MetricEvent>>,
}

impl MemoryMetricsSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in order.
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Count of events matching a predicate.
    pub fn count_matching(&self, predicate: impl Fn(&MetricEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl MetricsSink for MemoryMetricsSink {
    fn record(&self, event: MetricEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
