//! Provider health tracking.
//!
//! One state machine per provider: Healthy, Degraded, Unhealthy. Failures
//! move a provider down; recovery is monotonic and stepwise. An Unhealthy
//! provider never jumps straight back to Healthy - it passes through
//! Degraded first, and only after its cooldown has elapsed.

use crate::registry::ProviderRegistry;
use chrono::Utc;
use fortitude_core::{
    HealthSettings, HealthSnapshot, HealthState, MetricEvent, MetricsSink, ProviderError,
    ProviderId, Timestamp,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

/// Mutable health record for one provider.
///
/// Guarded by a single mutex; every transition decision reads and writes
/// the counters and the state together, so partial updates are never
/// observable.
struct HealthCell {
    state: HealthState,
    since: Timestamp,
    consecutive_failures: u32,
    consecutive_successes: u32,
    /// Rolling outcome window, `true` for success. Bounded by
    /// `HealthSettings::error_window`.
    window: VecDeque<bool>,
}

impl HealthCell {
    fn new() -> Self {
        Self {
            state: HealthState::Healthy,
            since: Utc::now(),
            consecutive_failures: 0,
            consecutive_successes: 0,
            window: VecDeque::new(),
        }
    }

    fn push_outcome(&mut self, success: bool, window_size: usize) {
        self.window.push_back(success);
        while self.window.len() > window_size {
            self.window.pop_front();
        }
    }

    fn error_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|ok| !**ok).count();
        failures as f64 / self.window.len() as f64
    }

    fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            consecutive_successes: self.consecutive_successes,
            since: self.since,
        }
    }
}

/// Tracks health state for every registered provider.
///
/// Outcomes are reported by the fallback engine after each attempt and by
/// scheduled health checks. Providers not yet observed report Healthy.
pub struct HealthMonitor {
    records: RwLock<HashMap<ProviderId, Arc<Mutex<HealthCell>>>>,
    settings: HealthSettings,
    metrics: Arc<dyn MetricsSink>,
}

impl HealthMonitor {
    /// Create a monitor with the given thresholds.
    pub fn new(settings: HealthSettings, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            settings,
            metrics,
        }
    }

    fn cell(&self, id: &ProviderId) -> Arc<Mutex<HealthCell>> {
        if let Ok(records) = self.records.read() {
            if let Some(cell) = records.get(id) {
                return Arc::clone(cell);
            }
        }
        match self.records.write() {
            Ok(mut records) => Arc::clone(
                records
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(HealthCell::new()))),
            ),
            // Poisoned map: hand out a detached record rather than panic.
            // Its transitions will not be remembered, which fails safe
            // toward treating the provider as Healthy.
            Err(_) => Arc::new(Mutex::new(HealthCell::new())),
        }
    }

    fn transition(&self, id: &ProviderId, cell: &mut HealthCell, to: HealthState) {
        let from = cell.state;
        if from == to {
            return;
        }
        cell.state = to;
        cell.since = Utc::now();
        cell.window.clear();
        if to == HealthState::Unhealthy {
            warn!(provider = %id, ?from, ?to, "provider health transition");
        } else {
            info!(provider = %id, ?from, ?to, "provider health transition");
        }
        self.metrics.record(MetricEvent::HealthTransition {
            provider: id.to_string(),
            from,
            to,
        });
    }

    /// Record a successful call to a provider.
    pub fn record_success(&self, id: &ProviderId) {
        let cell = self.cell(id);
        let Ok(mut cell) = cell.lock() else { return };

        cell.consecutive_failures = 0;
        cell.consecutive_successes = cell.consecutive_successes.saturating_add(1);
        let window_size = self.settings.error_window;
        cell.push_outcome(true, window_size);

        match cell.state {
            HealthState::Unhealthy => {
                let cooldown_over = match chrono::Duration::from_std(self.settings.cooldown) {
                    Ok(cooldown) => Utc::now() - cell.since >= cooldown,
                    Err(_) => false,
                };
                if cell.consecutive_successes >= self.settings.recovery_consecutive_successes
                    && cooldown_over
                {
                    // The streak is spent stepping up to Degraded; the next
                    // step to Healthy needs a fresh streak.
                    cell.consecutive_successes = 0;
                    self.transition(id, &mut cell, HealthState::Degraded);
                }
            }
            HealthState::Degraded => {
                if cell.consecutive_successes >= self.settings.recovery_consecutive_successes {
                    self.transition(id, &mut cell, HealthState::Healthy);
                }
            }
            HealthState::Healthy => {}
        }
    }

    /// Record a failed call to a provider.
    pub fn record_failure(&self, id: &ProviderId) {
        let cell = self.cell(id);
        let Ok(mut cell) = cell.lock() else { return };

        cell.consecutive_successes = 0;
        cell.consecutive_failures = cell.consecutive_failures.saturating_add(1);
        let window_size = self.settings.error_window;
        cell.push_outcome(false, window_size);

        if cell.consecutive_failures >= self.settings.unhealthy_consecutive_failures {
            self.transition(id, &mut cell, HealthState::Unhealthy);
        } else if cell.state == HealthState::Healthy
            && cell.window.len() >= self.settings.error_window
            && cell.error_rate() >= self.settings.degraded_error_rate
        {
            self.transition(id, &mut cell, HealthState::Degraded);
        }
    }

    /// Current state of a provider. Unobserved providers are Healthy.
    pub fn state(&self, id: &ProviderId) -> HealthState {
        let records = match self.records.read() {
            Ok(records) => records,
            Err(_) => return HealthState::Healthy,
        };
        records
            .get(id)
            .and_then(|cell| cell.lock().ok().map(|cell| cell.state))
            .unwrap_or(HealthState::Healthy)
    }

    /// States for every observed provider.
    pub fn states(&self) -> HashMap<ProviderId, HealthState> {
        self.snapshot()
            .into_iter()
            .map(|(id, snapshot)| (id, snapshot.state))
            .collect()
    }

    /// Full snapshot of every observed provider.
    pub fn snapshot(&self) -> HashMap<ProviderId, HealthSnapshot> {
        let records = match self.records.read() {
            Ok(records) => records,
            Err(_) => return HashMap::new(),
        };
        records
            .iter()
            .filter_map(|(id, cell)| {
                cell.lock().ok().map(|cell| (id.clone(), cell.snapshot()))
            })
            .collect()
    }

    /// Probe one provider now and record the outcome.
    pub async fn check_now(
        &self,
        registry: &ProviderRegistry,
        id: &ProviderId,
    ) -> Result<(), ProviderError> {
        let provider = registry.get(id)?;
        match provider.health_check().await {
            Ok(()) => {
                self.record_success(id);
                Ok(())
            }
            Err(error) => {
                self.record_failure(id);
                Err(error)
            }
        }
    }

    /// Run scheduled health checks forever, at the configured interval.
    ///
    /// Intended to be spawned as a background task.
    pub async fn run_scheduled(self: Arc<Self>, registry: Arc<ProviderRegistry>) {
        let mut ticker = tokio::time::interval(self.settings.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            for id in registry.ids() {
                if let Err(error) = self.check_now(&registry, &id).await {
                    warn!(provider = %id, %error, "scheduled health check failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("settings", &self.settings)
            .field("observed", &self.snapshot().len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::ScriptedProvider;
    use fortitude_core::MemoryMetricsSink;
    use std::time::Duration;

    fn settings() -> HealthSettings {
        HealthSettings {
            degraded_error_rate: 0.3,
            error_window: 4,
            unhealthy_consecutive_failures: 3,
            recovery_consecutive_successes: 2,
            cooldown: Duration::from_millis(0),
            check_interval: Duration::from_secs(30),
        }
    }

    fn monitor() -> (HealthMonitor, Arc<MemoryMetricsSink>) {
        let sink = Arc::new(MemoryMetricsSink::new());
        (HealthMonitor::new(settings(), sink.clone()), sink)
    }

    #[test]
    fn test_unobserved_provider_is_healthy() {
        let (monitor, _) = monitor();
        assert_eq!(monitor.state(&ProviderId::new("ghost")), HealthState::Healthy);
    }

    #[test]
    fn test_consecutive_failures_reach_unhealthy() {
        let (monitor, sink) = monitor();
        let id = ProviderId::new("a");

        monitor.record_failure(&id);
        monitor.record_failure(&id);
        assert_ne!(monitor.state(&id), HealthState::Unhealthy);

        monitor.record_failure(&id);
        assert_eq!(monitor.state(&id), HealthState::Unhealthy);

        let transitions = sink.count_matching(|e| {
            matches!(e, MetricEvent::HealthTransition { to, .. } if *to == HealthState::Unhealthy)
        });
        assert_eq!(transitions, 1);
    }

    #[test]
    fn test_error_rate_degrades_healthy_provider() {
        let (monitor, _) = monitor();
        let id = ProviderId::new("a");

        // Full window of 4 with 2 failures: error rate 0.5 >= 0.3.
        // Interleaved so consecutive failures never reach the unhealthy
        // threshold.
        monitor.record_success(&id);
        monitor.record_failure(&id);
        monitor.record_success(&id);
        monitor.record_failure(&id);

        assert_eq!(monitor.state(&id), HealthState::Degraded);
    }

    #[test]
    fn test_short_window_does_not_degrade() {
        let (monitor, _) = monitor();
        let id = ProviderId::new("a");

        monitor.record_failure(&id);
        assert_eq!(monitor.state(&id), HealthState::Healthy);
    }

    #[test]
    fn test_recovery_is_stepwise() {
        let (monitor, _) = monitor();
        let id = ProviderId::new("a");

        for _ in 0..3 {
            monitor.record_failure(&id);
        }
        assert_eq!(monitor.state(&id), HealthState::Unhealthy);

        // Two successes recover one step only, never straight to Healthy.
        monitor.record_success(&id);
        assert_eq!(monitor.state(&id), HealthState::Unhealthy);
        monitor.record_success(&id);
        assert_eq!(monitor.state(&id), HealthState::Degraded);

        monitor.record_success(&id);
        assert_eq!(monitor.state(&id), HealthState::Degraded);
        monitor.record_success(&id);
        assert_eq!(monitor.state(&id), HealthState::Healthy);
    }

    #[test]
    fn test_cooldown_blocks_recovery() {
        let sink = Arc::new(MemoryMetricsSink::new());
        let mut cfg = settings();
        cfg.cooldown = Duration::from_secs(3600);
        let monitor = HealthMonitor::new(cfg, sink);
        let id = ProviderId::new("a");

        for _ in 0..3 {
            monitor.record_failure(&id);
        }
        for _ in 0..10 {
            monitor.record_success(&id);
        }
        assert_eq!(monitor.state(&id), HealthState::Unhealthy);
    }

    #[test]
    fn test_failure_resets_recovery_progress() {
        let (monitor, _) = monitor();
        let id = ProviderId::new("a");

        for _ in 0..3 {
            monitor.record_failure(&id);
        }
        monitor.record_success(&id);
        monitor.record_failure(&id);
        monitor.record_success(&id);
        // Success streak restarted after the failure.
        assert_eq!(monitor.state(&id), HealthState::Unhealthy);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot[&id].consecutive_successes, 1);
    }

    #[tokio::test]
    async fn test_check_now_records_outcome() {
        let (monitor, _) = monitor();
        let mut registry = ProviderRegistry::new();
        let provider = Arc::new(ScriptedProvider::always_succeeding("a"));
        registry.register(provider.clone());
        let id = ProviderId::new("a");

        assert!(monitor.check_now(&registry, &id).await.is_ok());
        assert_eq!(monitor.snapshot()[&id].consecutive_successes, 1);

        provider.set_healthy(false);
        assert!(monitor.check_now(&registry, &id).await.is_err());
        assert_eq!(monitor.snapshot()[&id].consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_check_now_unknown_provider() {
        let (monitor, _) = monitor();
        let registry = ProviderRegistry::new();
        let result = monitor.check_now(&registry, &ProviderId::new("ghost")).await;
        assert!(matches!(result, Err(ProviderError::NotRegistered { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_checks_cover_all_providers() {
        let sink = Arc::new(MemoryMetricsSink::new());
        let monitor = Arc::new(HealthMonitor::new(settings(), sink));
        let a = Arc::new(ScriptedProvider::always_succeeding("a"));
        let b = Arc::new(ScriptedProvider::always_succeeding("b"));
        let mut registry = ProviderRegistry::new();
        registry.register(a.clone());
        registry.register(b.clone());

        let task = tokio::spawn(Arc::clone(&monitor).run_scheduled(Arc::new(registry)));
        // Ticks land at 0s, 30s and 60s with the 30s check interval.
        tokio::time::sleep(Duration::from_secs(65)).await;
        task.abort();

        assert!(a.health_checks() >= 2, "a probed {} times", a.health_checks());
        assert!(b.health_checks() >= 2, "b probed {} times", b.health_checks());
        assert_eq!(
            monitor.snapshot()[&ProviderId::new("a")].state,
            HealthState::Healthy
        );
    }
}
