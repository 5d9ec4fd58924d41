//! Fortitude Core - Shared Data Types
//!
//! Pure data structures with no behavior beyond validation. All other
//! Fortitude crates depend on this. This crate contains ONLY data types,
//! the error taxonomy, and the metrics seam - no caching or provider logic.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod request;

pub use config::{
    CacheSettings, FallbackSettings, FortitudeConfig, HealthSettings, SelectionWeights,
};
pub use error::{
    AttemptFailure, CacheError, FortitudeError, FortitudeResult, ProviderError, ValidationError,
};
pub use health::{HealthSnapshot, HealthState};
pub use metrics::{AttemptOutcome, MemoryMetricsSink, MetricEvent, MetricsSink, NoopMetricsSink};
pub use request::{
    AudienceLevel, DomainContext, ProviderId, QualityRequirements, QualityScore, ResearchRequest,
    ResearchResponse, ResearchType,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 topic hash used in deterministic cache key derivation.
pub type TopicHash = [u8; 32];

/// Compute the SHA-256 hash of a research topic.
///
/// The topic is trimmed before hashing so that leading/trailing whitespace
/// never produces distinct keys for the same logical topic.
pub fn compute_topic_hash(topic: &str) -> TopicHash {
    let mut hasher = Sha256::new();
    hasher.update(topic.trim().as_bytes());
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
