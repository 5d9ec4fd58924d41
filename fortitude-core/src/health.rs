//! Provider health state types.
//!
//! The state machine itself lives in `fortitude-provider`; these types are
//! shared so that dashboards and the selection engine read one vocabulary.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Operational status of a provider, derived from recent call outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Provider is fully operational.
    Healthy,
    /// Error rate crossed the degraded threshold; still usable.
    Degraded,
    /// Consecutive-failure threshold exceeded or health check failed.
    Unhealthy,
}

impl HealthState {
    /// Whether a provider in this state may be selected normally.
    ///
    /// Unhealthy providers are excluded from chains except as a last
    /// resort when nothing else remains.
    pub fn is_selectable(&self) -> bool {
        !matches!(self, HealthState::Unhealthy)
    }
}

/// Read-only view of one provider's health, as returned by
/// `health_snapshot()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Current state.
    pub state: HealthState,
    /// Consecutive failures observed since the last success.
    pub consecutive_failures: u32,
    /// Consecutive successes observed since the last failure.
    pub consecutive_successes: u32,
    /// When the current state was entered.
    pub since: Timestamp,
}
