//! Provider ranking.
//!
//! Produces an ordered fallback chain for a request from the registry's
//! static metadata and the monitor's current health states. The ranking is
//! fully deterministic: equal scores break on configured priority, then on
//! provider id.

use crate::registry::ProviderRegistry;
use fortitude_core::{HealthState, ProviderId, ResearchRequest, SelectionWeights};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Ranks capable providers into a fallback chain.
#[derive(Debug, Clone, Copy)]
pub struct SelectionEngine {
    weights: SelectionWeights,
}

struct ScoredCandidate {
    id: ProviderId,
    state: HealthState,
    score: f64,
    priority: u8,
}

impl SelectionEngine {
    /// Create an engine with the given ranking weights.
    pub fn new(weights: SelectionWeights) -> Self {
        Self { weights }
    }

    /// Build the fallback chain for a request.
    ///
    /// Healthy providers rank ahead of Degraded ones regardless of score.
    /// Unhealthy providers are excluded, except when every capable provider
    /// is Unhealthy: then exactly the single best one is returned as a last
    /// resort. Providers absent from `states` count as Healthy.
    pub fn select(
        &self,
        request: &ResearchRequest,
        registry: &ProviderRegistry,
        states: &HashMap<ProviderId, HealthState>,
    ) -> Vec<ProviderId> {
        let capable: Vec<_> = registry
            .all_metadata()
            .into_iter()
            .filter(|metadata| metadata.supports(request.research_type))
            .collect();
        if capable.is_empty() {
            return Vec::new();
        }

        // Normalize latency and cost against the worst capable candidate so
        // the weighted terms share the quality scale.
        let max_latency = capable
            .iter()
            .map(|m| m.predicted_latency_ms)
            .max()
            .unwrap_or(0);
        let max_cost = capable
            .iter()
            .map(|m| m.cost.cost_per_call)
            .fold(0.0_f64, f64::max);

        let mut candidates: Vec<ScoredCandidate> = capable
            .into_iter()
            .map(|metadata| {
                let norm_latency = if max_latency > 0 {
                    metadata.predicted_latency_ms as f64 / max_latency as f64
                } else {
                    0.0
                };
                let norm_cost = if max_cost > 0.0 {
                    metadata.cost.cost_per_call / max_cost
                } else {
                    0.0
                };
                let score = self.weights.quality * metadata.predicted_quality
                    - self.weights.latency * norm_latency
                    - self.weights.cost * norm_cost;
                ScoredCandidate {
                    id: metadata.id.clone(),
                    state: states
                        .get(&metadata.id)
                        .copied()
                        .unwrap_or(HealthState::Healthy),
                    score,
                    priority: metadata.priority,
                }
            })
            .collect();

        candidates.sort_by(rank);

        if candidates.iter().all(|c| c.state == HealthState::Unhealthy) {
            return candidates
                .into_iter()
                .take(1)
                .map(|c| c.id)
                .collect();
        }

        candidates
            .into_iter()
            .filter(|c| c.state.is_selectable())
            .map(|c| c.id)
            .collect()
    }
}

impl Default for SelectionEngine {
    fn default() -> Self {
        Self::new(SelectionWeights::default())
    }
}

fn state_rank(state: HealthState) -> u8 {
    match state {
        HealthState::Healthy => 0,
        HealthState::Degraded => 1,
        HealthState::Unhealthy => 2,
    }
}

fn rank(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    state_rank(a.state)
        .cmp(&state_rank(b.state))
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.id.cmp(&b.id))
}

// ============================================================================
// Tests
// ============================================================================
