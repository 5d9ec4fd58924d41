//! Cache entry metadata and usage statistics.

use chrono::Utc;
use fortitude_core::{ResearchResponse, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A cached research response with its metadata.
///
/// Entries are owned exclusively by the store; callers receive clones,
/// never references into the index. Serializable so that slow tiers can
/// persist entries off-heap. The hit counter is atomic so lookups can
/// bump it under a shared lock without serializing readers.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached response.
    pub value: ResearchResponse,
    /// When this entry was created.
    pub created_at: Timestamp,
    /// Time-to-live from creation.
    pub ttl: Duration,
    /// Approximate payload size in bytes.
    pub size_bytes: usize,
    /// How many times this entry has been served.
    pub hit_count: AtomicU64,
    /// Version of the producing pipeline; promotion across tiers requires
    /// a matching version.
    pub source_version: u32,
}

impl Clone for CacheEntry {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            created_at: self.created_at,
            ttl: self.ttl,
            size_bytes: self.size_bytes,
            hit_count: AtomicU64::new(self.hit_count.load(Ordering::Relaxed)),
            source_version: self.source_version,
        }
    }
}

impl PartialEq for CacheEntry {
    // The hit counter is usage bookkeeping, not identity.
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && self.created_at == other.created_at
            && self.ttl == other.ttl
            && self.size_bytes == other.size_bytes
            && self.source_version == other.source_version
    }
}

impl CacheEntry {
    /// Create a fresh entry for a response.
    pub fn new(value: ResearchResponse, ttl: Duration, source_version: u32) -> Self {
        let size_bytes = value.content.len();
        Self {
            value,
            created_at: Utc::now(),
            ttl,
            size_bytes,
            hit_count: AtomicU64::new(0),
            source_version,
        }
    }

    /// Whether this entry has outlived its TTL as of `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        let age = now.signed_duration_since(self.created_at);
        match age.to_std() {
            Ok(age) => age > self.ttl,
            // created_at in the future (clock skew): treat as fresh.
            Err(_) => false,
        }
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
