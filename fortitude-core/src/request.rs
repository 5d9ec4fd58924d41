//! Request and response model for the research core.
//!
//! These are the internal shapes that the protocol layer translates external
//! requests into. The core never parses wire formats itself.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for a registered research provider.
///
/// Comparison and ordering are lexicographic over the underlying name,
/// which gives the selection engine a deterministic tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a new provider id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the provider name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Category of research being requested.
///
/// This is a closed set: providers declare which types they can serve, and
/// the cache key encodes the type as a single discriminant byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResearchType {
    /// Choosing between alternatives
    Decision,
    /// How to build something
    Implementation,
    /// Diagnosing a problem
    Troubleshooting,
    /// Understanding a concept
    Learning,
    /// Verifying an approach
    Validation,
}

impl ResearchType {
    /// All research types, in discriminant order.
    pub const ALL: [ResearchType; 5] = [
        ResearchType::Decision,
        ResearchType::Implementation,
        ResearchType::Troubleshooting,
        ResearchType::Learning,
        ResearchType::Validation,
    ];
}

/// Audience expertise level attached to a request.
///
/// An unknown audience maps to `Unspecified` rather than being omitted, so
/// that two requests with distinct unspecified contexts never collide on key
/// derivation by omission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudienceLevel {
    Beginner,
    Intermediate,
    Advanced,
    #[default]
    Unspecified,
}

/// Technology domain context for a request (e.g. "rust", "kubernetes").
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainContext(String);

/// Token substituted for an empty or unknown domain.
const UNSPECIFIED_DOMAIN: &str = "unspecified";

impl DomainContext {
    /// Create a new domain context.
    pub fn new(domain: impl Into<String>) -> Self {
        Self(domain.into())
    }

    /// The canonical form used in key derivation.
    ///
    /// Empty or whitespace-only domains normalize to the explicit
    /// `"unspecified"` token; everything else is lowercased and trimmed.
    pub fn canonical(&self) -> String {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            UNSPECIFIED_DOMAIN.to_string()
        } else {
            trimmed.to_lowercase()
        }
    }

    /// The raw domain string as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DomainContext {
    fn from(domain: &str) -> Self {
        Self::new(domain)
    }
}

/// Minimum quality a caller will accept for a response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityRequirements {
    /// Minimum acceptable composite score, in [0, 1].
    pub min_composite: f64,
}

impl Default for QualityRequirements {
    fn default() -> Self {
        Self { min_composite: 0.0 }
    }
}

/// A logical research request.
///
/// Produced by the protocol layer; the core treats it as opaque input for
/// key derivation and provider dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// The research topic (free text, must be non-empty for caching).
    pub topic: String,
    /// Category of research.
    pub research_type: ResearchType,
    /// Audience expertise context.
    pub audience: AudienceLevel,
    /// Technology domain context.
    pub domain: DomainContext,
    /// Quality floor for acceptable responses.
    pub quality: QualityRequirements,
    /// Classification confidence supplied by the upstream classifier,
    /// in [0, 1]. Banded (never used raw) during key derivation.
    pub confidence: f64,
}

impl ResearchRequest {
    /// Create a request with default audience, domain, quality, and full
    /// classification confidence.
    pub fn new(topic: impl Into<String>, research_type: ResearchType) -> Self {
        Self {
            topic: topic.into(),
            research_type,
            audience: AudienceLevel::default(),
            domain: DomainContext::default(),
            quality: QualityRequirements::default(),
            confidence: 1.0,
        }
    }

    /// Set the classification confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the audience level.
    pub fn with_audience(mut self, audience: AudienceLevel) -> Self {
        self.audience = audience;
        self
    }

    /// Set the domain context.
    pub fn with_domain(mut self, domain: impl Into<DomainContext>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the quality requirements.
    pub fn with_quality(mut self, quality: QualityRequirements) -> Self {
        self.quality = quality;
        self
    }
}

/// Quality scores for a research response.
///
/// Scores are consumed, not computed, by this core: the scoring model lives
/// upstream. All dimensions are clamped into [0, 1] at construction so the
/// invariant holds regardless of the producer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub relevance: f64,
    pub accuracy: f64,
    pub completeness: f64,
    pub clarity: f64,
    /// Composite score in [0, 1].
    pub composite: f64,
}

impl QualityScore {
    /// Create a quality score, clamping every dimension into [0, 1].
    ///
    /// NaN inputs clamp to 0.0.
    pub fn new(relevance: f64, accuracy: f64, completeness: f64, clarity: f64, composite: f64) -> Self {
        Self {
            relevance: clamp_unit(relevance),
            accuracy: clamp_unit(accuracy),
            completeness: clamp_unit(completeness),
            clarity: clamp_unit(clarity),
            composite: clamp_unit(composite),
        }
    }

    /// A uniform score across all dimensions.
    pub fn uniform(score: f64) -> Self {
        Self::new(score, score, score, score, score)
    }

    /// Whether this score satisfies the given requirements.
    pub fn satisfies(&self, requirements: &QualityRequirements) -> bool {
        self.composite >= requirements.min_composite
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A successful research response from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResponse {
    /// Unique response id (UUIDv7, time-ordered).
    pub id: Uuid,
    /// The research content.
    pub content: String,
    /// Which provider produced this response.
    pub provider: ProviderId,
    /// Quality assessment supplied with the response.
    pub quality: QualityScore,
    /// When the response was fetched from the provider.
    pub fetched_at: Timestamp,
}

impl ResearchResponse {
    /// Create a response fetched now, with a fresh id.
    pub fn new(content: impl Into<String>, provider: ProviderId, quality: QualityScore) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            provider,
            quality,
            fetched_at: chrono::Utc::now(),
        }
    }
}
