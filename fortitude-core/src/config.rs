//! Configuration types.
//!
//! The configuration loader (out of scope here) assembles these at startup
//! and hands them to the core as a read-only structure. Every section
//! validates itself; an invalid section is a construction-time
//! `ValidationError`, never a runtime surprise.

use crate::error::ValidationError;
use crate::request::ResearchType;
use std::collections::HashMap;
use std::time::Duration;

/// Cache tuning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Maximum number of entries held in the fast tier.
    pub l1_capacity: usize,
    /// TTL applied to cached entries.
    pub entry_ttl: Duration,
    /// Number of index shards. Must be a power of two.
    pub shard_count: usize,
    /// Default confidence band width, in (0, 1].
    pub band_width: f64,
    /// Per-research-type band width overrides.
    pub band_width_overrides: HashMap<ResearchType, f64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            l1_capacity: 10_000,
            entry_ttl: Duration::from_secs(3600),
            shard_count: 16,
            band_width: 0.1,
            band_width_overrides: HashMap::new(),
        }
    }
}

impl CacheSettings {
    /// Create cache settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fast-tier capacity.
    pub fn with_l1_capacity(mut self, capacity: usize) -> Self {
        self.l1_capacity = capacity;
        self
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Set the shard count.
    pub fn with_shard_count(mut self, shards: usize) -> Self {
        self.shard_count = shards;
        self
    }

    /// Set the default confidence band width.
    pub fn with_band_width(mut self, width: f64) -> Self {
        self.band_width = width;
        self
    }

    /// Override the band width for one research type.
    pub fn with_band_width_override(mut self, research_type: ResearchType, width: f64) -> Self {
        self.band_width_overrides.insert(research_type, width);
        self
    }

    /// The band width in effect for a research type.
    pub fn width_for(&self, research_type: ResearchType) -> f64 {
        self.band_width_overrides
            .get(&research_type)
            .copied()
            .unwrap_or(self.band_width)
    }

    /// Validate this section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.shard_count == 0 || !self.shard_count.is_power_of_two() {
            return Err(ValidationError::InvalidValue {
                field: "shard_count".to_string(),
                reason: format!("{} is not a power of two", self.shard_count),
            });
        }
        for (label, width) in std::iter::once(("band_width", self.band_width)).chain(
            self.band_width_overrides
                .values()
                .map(|w| ("band_width_overrides", *w)),
        ) {
            if !(width > 0.0 && width <= 1.0) {
                return Err(ValidationError::InvalidValue {
                    field: label.to_string(),
                    reason: format!("band width {} outside (0, 1]", width),
                });
            }
        }
        if self.l1_capacity == 0 {
            return Err(ValidationError::InvalidValue {
                field: "l1_capacity".to_string(),
                reason: "capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Health monitor thresholds and timers.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSettings {
    /// Error rate over the rolling window at which Healthy degrades.
    pub degraded_error_rate: f64,
    /// Size of the rolling outcome window used for the error rate.
    pub error_window: usize,
    /// Consecutive failures at which a provider becomes Unhealthy.
    pub unhealthy_consecutive_failures: u32,
    /// Consecutive successes required for recovery by one step.
    pub recovery_consecutive_successes: u32,
    /// Minimum time an Unhealthy provider stays out before recovery.
    pub cooldown: Duration,
    /// Interval between scheduled health checks.
    pub check_interval: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            degraded_error_rate: 0.3,
            error_window: 20,
            unhealthy_consecutive_failures: 5,
            recovery_consecutive_successes: 3,
            cooldown: Duration::from_secs(60),
            check_interval: Duration::from_secs(30),
        }
    }
}

impl HealthSettings {
    /// Validate this section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.degraded_error_rate) {
            return Err(ValidationError::InvalidValue {
                field: "degraded_error_rate".to_string(),
                reason: format!("{} outside [0, 1]", self.degraded_error_rate),
            });
        }
        if self.error_window == 0 {
            return Err(ValidationError::InvalidValue {
                field: "error_window".to_string(),
                reason: "window must be at least 1".to_string(),
            });
        }
        if self.unhealthy_consecutive_failures == 0 {
            return Err(ValidationError::InvalidValue {
                field: "unhealthy_consecutive_failures".to_string(),
                reason: "threshold must be at least 1".to_string(),
            });
        }
        if self.recovery_consecutive_successes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "recovery_consecutive_successes".to_string(),
                reason: "threshold must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Weights for the provider ranking function.
///
/// Score = quality * predicted_quality - latency * normalized_latency
///       - cost * normalized_cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionWeights {
    pub quality: f64,
    pub latency: f64,
    pub cost: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            quality: 1.0,
            latency: 0.3,
            cost: 0.2,
        }
    }
}

impl SelectionWeights {
    /// Validate this section. Weights must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("quality", self.quality),
            ("latency", self.latency),
            ("cost", self.cost),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("weight {} must be finite and non-negative", value),
                });
            }
        }
        Ok(())
    }
}

/// Fallback execution timeouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackSettings {
    /// Timeout applied to each individual provider attempt.
    pub attempt_timeout: Duration,
    /// Overall budget for one logical request across all attempts.
    pub request_budget: Duration,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            request_budget: Duration::from_secs(120),
        }
    }
}

impl FallbackSettings {
    /// Validate this section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.attempt_timeout.is_zero() {
            return Err(ValidationError::InvalidValue {
                field: "attempt_timeout".to_string(),
                reason: "timeout must be non-zero".to_string(),
            });
        }
        if self.request_budget < self.attempt_timeout {
            return Err(ValidationError::InvalidValue {
                field: "request_budget".to_string(),
                reason: "budget must be at least one attempt timeout".to_string(),
            });
        }
        Ok(())
    }
}

/// Master configuration for the Fortitude core.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FortitudeConfig {
    pub cache: CacheSettings,
    pub health: HealthSettings,
    pub selection: SelectionWeights,
    pub fallback: FallbackSettings,
}

impl FortitudeConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.cache.validate()?;
        self.health.validate()?;
        self.selection.validate()?;
        self.fallback.validate()?;
        Ok(())
    }
}
