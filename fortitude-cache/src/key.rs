//! Deterministic cache key derivation.
//!
//! A `CacheKey` is a pure function of the logical request attributes: topic
//! hash, research type, audience, domain, and a *banded* confidence value.
//! The private inner struct means a key can only be built through
//! `KeyGenerator::key`, which performs validation and banding - there is no
//! way to smuggle a raw floating-point confidence into a key.

use fortitude_core::{
    compute_topic_hash, AudienceLevel, CacheError, CacheSettings, ResearchRequest, ResearchType,
    TopicHash,
};
use sha2::{Digest, Sha256};

/// Separator byte between key segments.
const SEPARATOR: u8 = 0xFF;

/// A deterministic, order-fixed cache key.
///
/// # Binary Format
///
/// The key encodes to a variable-length byte string with fixed field order:
/// - Bytes 0-31: SHA-256 topic hash
/// - Byte 32: separator (0xFF)
/// - Byte 33: research type discriminant
/// - Byte 34: audience discriminant
/// - Byte 35: separator (0xFF)
/// - Bytes 36-37: confidence bucket (u16, big-endian)
/// - Byte 38: separator (0xFF)
/// - Bytes 39-40: domain length (u16, big-endian)
/// - Bytes 41..: canonical domain bytes (UTF-8, lowercased)
///
/// Logically identical inputs produce byte-identical encodings; the
/// encoding is locale-independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Private inner data - cannot be constructed externally.
    inner: KeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KeyInner {
    topic_hash: TopicHash,
    research_type: ResearchType,
    audience: AudienceLevel,
    domain: String,
    confidence_bucket: u16,
}

impl CacheKey {
    /// The confidence bucket this key was derived with.
    pub fn confidence_bucket(&self) -> u16 {
        self.inner.confidence_bucket
    }

    /// The research type encoded in this key.
    pub fn research_type(&self) -> ResearchType {
        self.inner.research_type
    }

    /// Encode this key into its canonical byte representation.
    pub fn encode(&self) -> Vec<u8> {
        let domain = self.inner.domain.as_bytes();
        let mut bytes = Vec::with_capacity(41 + domain.len());

        bytes.extend_from_slice(&self.inner.topic_hash);
        bytes.push(SEPARATOR);
        bytes.push(research_type_to_byte(self.inner.research_type));
        bytes.push(audience_to_byte(self.inner.audience));
        bytes.push(SEPARATOR);
        bytes.extend_from_slice(&self.inner.confidence_bucket.to_be_bytes());
        bytes.push(SEPARATOR);
        bytes.extend_from_slice(&(domain.len() as u16).to_be_bytes());
        bytes.extend_from_slice(domain);

        bytes
    }

    /// A short hex fingerprint of the canonical encoding, for logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.encode());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

/// Convert ResearchType to a single-byte discriminant.
fn research_type_to_byte(research_type: ResearchType) -> u8 {
    match research_type {
        ResearchType::Decision => 0,
        ResearchType::Implementation => 1,
        ResearchType::Troubleshooting => 2,
        ResearchType::Learning => 3,
        ResearchType::Validation => 4,
    }
}

/// Convert AudienceLevel to a single-byte discriminant.
fn audience_to_byte(audience: AudienceLevel) -> u8 {
    match audience {
        AudienceLevel::Beginner => 0,
        AudienceLevel::Intermediate => 1,
        AudienceLevel::Advanced => 2,
        AudienceLevel::Unspecified => 3,
    }
}

/// Derives cache keys from logical request attributes.
///
/// Banding is applied strictly before serialization: two requests whose
/// confidence values fall in the same band yield identical keys, so
/// floating-point noise never causes a spurious miss.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    settings: CacheSettings,
}

impl KeyGenerator {
    /// Create a generator using the given cache settings.
    ///
    /// The settings carry the default band width and any per-research-type
    /// overrides.
    pub fn new(settings: CacheSettings) -> Self {
        Self { settings }
    }

    /// Derive the cache key for a request.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidKeyInput` if the topic is empty or the
    /// request's confidence is NaN or outside [0, 1]. Both are rejected
    /// before any hashing occurs.
    pub fn key(&self, request: &ResearchRequest) -> Result<CacheKey, CacheError> {
        if request.topic.trim().is_empty() {
            return Err(CacheError::InvalidKeyInput {
                reason: "topic is empty".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&request.confidence) {
            return Err(CacheError::InvalidKeyInput {
                reason: format!("confidence {} outside [0, 1]", request.confidence),
            });
        }

        let bucket = self.band(request.research_type, request.confidence);

        Ok(CacheKey {
            inner: KeyInner {
                topic_hash: compute_topic_hash(&request.topic),
                research_type: request.research_type,
                audience: request.audience,
                domain: request.domain.canonical(),
                confidence_bucket: bucket,
            },
        })
    }

    /// Quantize a confidence value into its band for a research type.
    ///
    /// Buckets are `floor(confidence / width)`, with 1.0 clamped into the
    /// top bucket so the band count stays `ceil(1 / width)`.
    fn band(&self, research_type: ResearchType, confidence: f64) -> u16 {
        let width = self.settings.width_for(research_type);
        let max_bucket = ((1.0 / width).ceil() as u16).saturating_sub(1);
        let bucket = (confidence / width).floor() as u16;
        bucket.min(max_bucket)
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn research_type_strategy() -> impl Strategy<Value = ResearchType> {
        prop_oneof![
            Just(ResearchType::Decision),
            Just(ResearchType::Implementation),
            Just(ResearchType::Troubleshooting),
            Just(ResearchType::Learning),
            Just(ResearchType::Validation),
        ]
    }

    fn audience_strategy() -> impl Strategy<Value = AudienceLevel> {
        prop_oneof![
            Just(AudienceLevel::Beginner),
            Just(AudienceLevel::Intermediate),
            Just(AudienceLevel::Advanced),
            Just(AudienceLevel::Unspecified),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Property: key derivation is a pure function of its inputs.
        #[test]
        fn prop_key_deterministic(
            topic in "[a-zA-Z0-9 ]{1,60}",
            research_type in research_type_strategy(),
            audience in audience_strategy(),
            domain in "[a-zA-Z]{0,20}",
            confidence in 0.0f64..=1.0f64,
        ) {
            prop_assume!(!topic.trim().is_empty());
            let gen = KeyGenerator::new(CacheSettings::default());
            let request = ResearchRequest::new(topic, research_type)
                .with_audience(audience)
                .with_domain(domain.as_str())
                .with_confidence(confidence);

            let a = gen.key(&request);
            let b = gen.key(&request);
            prop_assert_eq!(a.unwrap().encode(), b.unwrap().encode());
        }

        /// Property: confidence noise within one band never changes the key.
        #[test]
        fn prop_banding_idempotent(
            topic in "[a-zA-Z0-9 ]{1,60}",
            confidence in 0.0f64..1.0f64,
            noise in 0.0f64..0.0999f64,
        ) {
            prop_assume!(!topic.trim().is_empty());
            let width = 0.1;
            // Keep both samples inside the same band.
            let base = (confidence / width).floor() * width;
            let jittered = (base + noise).min(base + width - 1e-9);

            let gen = KeyGenerator::new(CacheSettings::default().with_band_width(width));
            let request = ResearchRequest::new(topic, ResearchType::Learning);

            let a = gen.key(&request.clone().with_confidence(base)).unwrap();
            let b = gen.key(&request.with_confidence(jittered)).unwrap();
            prop_assert_eq!(a, b);
        }

        /// Property: encodings of keys with differing fields differ.
        #[test]
        fn prop_encoding_injective_over_type_and_audience(
            topic in "[a-zA-Z0-9 ]{1,60}",
            t1 in research_type_strategy(),
            t2 in research_type_strategy(),
            a1 in audience_strategy(),
            a2 in audience_strategy(),
        ) {
            prop_assume!(!topic.trim().is_empty());
            let gen = KeyGenerator::new(CacheSettings::default());
            let r1 = ResearchRequest::new(topic.clone(), t1)
                .with_audience(a1)
                .with_confidence(0.5);
            let r2 = ResearchRequest::new(topic, t2)
                .with_audience(a2)
                .with_confidence(0.5);

            let k1 = gen.key(&r1).unwrap();
            let k2 = gen.key(&r2).unwrap();

            if t1 == t2 && a1 == a2 {
                prop_assert_eq!(k1.encode(), k2.encode());
            } else {
                prop_assert_ne!(k1.encode(), k2.encode());
            }
        }

        /// Property: the bucket never exceeds the top band.
        #[test]
        fn prop_bucket_bounded(
            confidence in 0.0f64..=1.0f64,
            width_hundredths in 1u16..=100u16,
        ) {
            let width = f64::from(width_hundredths) / 100.0;
            let gen = KeyGenerator::new(CacheSettings::default().with_band_width(width));
            let request =
                ResearchRequest::new("topic", ResearchType::Learning).with_confidence(confidence);

            let key = gen.key(&request).unwrap();
            let max_bucket = ((1.0 / width).ceil() as u16).saturating_sub(1);
            prop_assert!(key.confidence_bucket() <= max_bucket);
        }
    }
}
