//! Provider trait and static metadata.

use async_trait::async_trait;
use fortitude_core::{ProviderError, ProviderId, ResearchRequest, ResearchResponse, ResearchType};

/// Rate limit descriptor for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDescriptor {
    /// Maximum requests per minute the provider allows.
    pub requests_per_minute: u32,
}

impl Default for RateLimitDescriptor {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
        }
    }
}

/// Cost model for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostModel {
    /// Estimated cost per call, in arbitrary configured units.
    pub cost_per_call: f64,
}

/// Static catalog entry for a provider. Immutable after load; read by the
/// selection engine and the fallback engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMetadata {
    /// Unique provider id.
    pub id: ProviderId,
    /// Research types this provider can serve.
    pub capabilities: Vec<ResearchType>,
    /// Declared rate limit.
    pub rate_limit: RateLimitDescriptor,
    /// Declared cost model.
    pub cost: CostModel,
    /// Expected response quality, in [0, 1].
    pub predicted_quality: f64,
    /// Expected response latency in milliseconds.
    pub predicted_latency_ms: u64,
    /// Configured tie-break priority; higher wins.
    pub priority: u8,
}

impl ProviderMetadata {
    /// Create metadata serving every research type, with neutral
    /// predictions. Builder methods refine it.
    pub fn new(id: impl Into<ProviderId>) -> Self {
        Self {
            id: id.into(),
            capabilities: ResearchType::ALL.to_vec(),
            rate_limit: RateLimitDescriptor::default(),
            cost: CostModel::default(),
            predicted_quality: 0.5,
            predicted_latency_ms: 1000,
            priority: 0,
        }
    }

    /// Restrict the capability set.
    pub fn with_capabilities(mut self, capabilities: Vec<ResearchType>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the rate limit.
    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Self {
        self.rate_limit = RateLimitDescriptor {
            requests_per_minute,
        };
        self
    }

    /// Set the cost per call.
    pub fn with_cost(mut self, cost_per_call: f64) -> Self {
        self.cost = CostModel { cost_per_call };
        self
    }

    /// Set the predicted quality, clamped into [0, 1].
    pub fn with_predicted_quality(mut self, quality: f64) -> Self {
        self.predicted_quality = if quality.is_nan() {
            0.0
        } else {
            quality.clamp(0.0, 1.0)
        };
        self
    }

    /// Set the predicted latency.
    pub fn with_predicted_latency_ms(mut self, latency_ms: u64) -> Self {
        self.predicted_latency_ms = latency_ms;
        self
    }

    /// Set the tie-break priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Whether this provider can serve the given research type.
    pub fn supports(&self, research_type: ResearchType) -> bool {
        self.capabilities.contains(&research_type)
    }
}

/// A research provider.
///
/// This is a closed capability interface: exactly `execute`,
/// `health_check`, and `metadata`. Implementations are registered
/// explicitly with the [`crate::ProviderRegistry`].
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Execute a research request.
    async fn execute(&self, request: &ResearchRequest) -> Result<ResearchResponse, ProviderError>;

    /// Probe provider liveness. Cheap; called on a schedule and on demand
    /// after observed failures.
    async fn health_check(&self) -> Result<(), ProviderError>;

    /// Static metadata for this provider.
    fn metadata(&self) -> &ProviderMetadata;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let metadata = ProviderMetadata::new(ProviderId::new("serper"))
            .with_capabilities(vec![ResearchType::Learning])
            .with_rate_limit(120)
            .with_cost(0.002)
            .with_predicted_quality(0.9)
            .with_predicted_latency_ms(250)
            .with_priority(10);

        assert_eq!(metadata.id.as_str(), "serper");
        assert!(metadata.supports(ResearchType::Learning));
        assert!(!metadata.supports(ResearchType::Decision));
        assert_eq!(metadata.rate_limit.requests_per_minute, 120);
        assert_eq!(metadata.priority, 10);
    }

    #[test]
    fn test_predicted_quality_clamped() {
        let metadata = ProviderMetadata::new(ProviderId::new("a")).with_predicted_quality(1.7);
        assert_eq!(metadata.predicted_quality, 1.0);

        let metadata = ProviderMetadata::new(ProviderId::new("a")).with_predicted_quality(f64::NAN);
        assert_eq!(metadata.predicted_quality, 0.0);
    }

    #[test]
    fn test_default_serves_all_types() {
        let metadata = ProviderMetadata::new(ProviderId::new("a"));
        for research_type in ResearchType::ALL {
            assert!(metadata.supports(research_type));
        }
    }
}
