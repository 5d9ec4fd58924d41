//! Fallback execution.
//!
//! One entry point, `execute`, walks the ranked provider chain until a
//! provider succeeds or the chain is exhausted. The caller always gets
//! either a response or an aggregated failure that explains every attempt.

use crate::health::HealthMonitor;
use crate::registry::ProviderRegistry;
use crate::selection::SelectionEngine;
use chrono::Utc;
use fortitude_cache::{KeyGenerator, TieredStore};
use fortitude_core::{
    AttemptFailure, AttemptOutcome, CacheError, FallbackSettings, FortitudeError, FortitudeResult,
    HealthSnapshot, MetricEvent, MetricsSink, ProviderError, ProviderId, ResearchRequest,
    ResearchResponse, ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Executes research requests through the cache and the provider chain.
pub struct FallbackEngine {
    registry: Arc<ProviderRegistry>,
    monitor: Arc<HealthMonitor>,
    selection: SelectionEngine,
    store: Arc<TieredStore>,
    keygen: KeyGenerator,
    metrics: Arc<dyn MetricsSink>,
    settings: FallbackSettings,
}

impl FallbackEngine {
    /// Wire up an engine from its collaborators.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        monitor: Arc<HealthMonitor>,
        selection: SelectionEngine,
        store: Arc<TieredStore>,
        keygen: KeyGenerator,
        metrics: Arc<dyn MetricsSink>,
        settings: FallbackSettings,
    ) -> Self {
        Self {
            registry,
            monitor,
            selection,
            store,
            keygen,
            metrics,
            settings,
        }
    }

    /// Execute a request.
    ///
    /// Resolution order: cache, then each capable provider in ranked order.
    /// Each attempt is bounded by the attempt timeout and the whole request
    /// by the request budget. A retryable failure or timeout advances to
    /// the next candidate; a fatal failure aborts immediately; exhausting
    /// the chain yields `AllProvidersFailed` carrying every attempt.
    ///
    /// A malformed request (empty topic, out-of-range confidence) is a
    /// caller error and surfaces as `FortitudeError::Validation`.
    pub async fn execute(&self, request: &ResearchRequest) -> FortitudeResult<ResearchResponse> {
        let key = self.keygen.key(request).map_err(invalid_request)?;

        match self.store.get(&key).await {
            Ok(entry) if entry.value.quality.satisfies(&request.quality) => {
                debug!(key = %key.fingerprint(), "cache hit");
                return Ok(entry.value);
            }
            Ok(entry) => {
                debug!(
                    key = %key.fingerprint(),
                    composite = entry.value.quality.composite,
                    "cached response below quality floor, refetching"
                );
            }
            Err(err) => {
                debug!(key = %key.fingerprint(), %err, "cache miss, consulting providers");
            }
        }

        let chain = self
            .selection
            .select(request, &self.registry, &self.monitor.states());
        if chain.is_empty() {
            return Err(FortitudeError::AllProvidersFailed {
                attempts: Vec::new(),
            });
        }

        let deadline = Instant::now() + self.settings.request_budget;
        let mut attempts = Vec::with_capacity(chain.len());

        for id in chain {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("request budget exhausted before chain completed");
                break;
            }

            let provider = match self.registry.get(&id) {
                Ok(provider) => provider,
                Err(error) => {
                    // Unregistered between selection and dispatch.
                    attempts.push(AttemptFailure {
                        provider: id.clone(),
                        error,
                        attempted_at: Utc::now(),
                    });
                    continue;
                }
            };

            let attempt_timeout = self.settings.attempt_timeout.min(remaining);
            let started = Instant::now();
            let result = tokio::time::timeout(attempt_timeout, provider.execute(request)).await;

            match result {
                Ok(Ok(response)) => {
                    self.monitor.record_success(&id);
                    self.record_attempt(&id, AttemptOutcome::Success);
                    info!(provider = %id, attempts = attempts.len() + 1, "request served");
                    self.store.put(key, response.clone()).await;
                    return Ok(response);
                }
                Ok(Err(error)) if error.is_retryable() => {
                    self.monitor.record_failure(&id);
                    self.record_attempt(&id, AttemptOutcome::RetryableFailure);
                    warn!(provider = %id, %error, "provider attempt failed, advancing");
                    attempts.push(AttemptFailure {
                        provider: id.clone(),
                        error,
                        attempted_at: Utc::now(),
                    });
                }
                Ok(Err(error)) => {
                    // Fatal: retrying other providers cannot fix the request.
                    self.monitor.record_failure(&id);
                    self.record_attempt(&id, AttemptOutcome::FatalFailure);
                    warn!(provider = %id, %error, "fatal provider error, aborting chain");
                    return Err(FortitudeError::Provider(error));
                }
                Err(_elapsed) => {
                    let error = ProviderError::Timeout {
                        provider: id.to_string(),
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    };
                    self.monitor.record_failure(&id);
                    self.record_attempt(&id, AttemptOutcome::TimedOut);
                    warn!(provider = %id, %error, "provider attempt timed out, advancing");
                    attempts.push(AttemptFailure {
                        provider: id.clone(),
                        error,
                        attempted_at: Utc::now(),
                    });
                }
            }
        }

        Err(FortitudeError::AllProvidersFailed { attempts })
    }

    /// Drop any cached entry for this request. Idempotent.
    pub async fn invalidate(&self, request: &ResearchRequest) -> FortitudeResult<()> {
        let key = self.keygen.key(request).map_err(invalid_request)?;
        self.store.invalidate(&key).await;
        Ok(())
    }

    /// Health of every observed provider.
    pub fn health_snapshot(&self) -> HashMap<ProviderId, HealthSnapshot> {
        self.monitor.snapshot()
    }

    fn record_attempt(&self, id: &ProviderId, outcome: AttemptOutcome) {
        self.metrics.record(MetricEvent::ProviderAttempt {
            provider: id.to_string(),
            outcome,
        });
    }
}

/// A request the key generator rejects never reached the cache or a
/// provider, so it is the caller's mistake, not a cache fault.
fn invalid_request(err: CacheError) -> FortitudeError {
    FortitudeError::Validation(ValidationError::InvalidValue {
        field: "request".to_string(),
        reason: err.to_string(),
    })
}

impl std::fmt::Debug for FallbackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackEngine")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
