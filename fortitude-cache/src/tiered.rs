//! Two-level tiered store with explicit, observable fallback.
//!
//! `get` checks the fast tier, then the slow tier, promoting slow-tier hits
//! forward when they pass the freshness and version checks. Tier failures
//! degrade to misses with a metric event; the cache is an optimization and
//! never a correctness dependency, so no tier error ever reaches a caller.

use crate::entry::{CacheEntry, CacheStats};
use crate::key::CacheKey;
use crate::tier::CacheTier;
use chrono::Utc;
use fortitude_core::{CacheError, MetricEvent, MetricsSink, ResearchResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Two-level cache: fast L1 backed by an optional larger/slower L2.
pub struct TieredStore {
    l1: Arc<dyn CacheTier>,
    l2: Option<Arc<dyn CacheTier>>,
    metrics: Arc<dyn MetricsSink>,
    entry_ttl: Duration,
    source_version: u32,
}

impl TieredStore {
    /// Create an L1-only store.
    pub fn new(
        l1: Arc<dyn CacheTier>,
        metrics: Arc<dyn MetricsSink>,
        entry_ttl: Duration,
        source_version: u32,
    ) -> Self {
        Self {
            l1,
            l2: None,
            metrics,
            entry_ttl,
            source_version,
        }
    }

    /// Attach a slow tier.
    pub fn with_l2(mut self, l2: Arc<dyn CacheTier>) -> Self {
        self.l2 = Some(l2);
        self
    }

    /// Get a cached entry.
    ///
    /// Checks L1; on miss, checks L2 and promotes a fresh, version-matching
    /// hit into L1 before returning it. A stale or version-mismatched L2
    /// entry is dropped rather than promoted. Tier failures are absorbed:
    /// the result is `CacheError::Miss`, never the tier's error.
    pub async fn get(&self, key: &CacheKey) -> Result<CacheEntry, CacheError> {
        match self.l1.get(key).await {
            Ok(Some(entry)) => {
                self.metrics.record(MetricEvent::CacheHit {
                    tier: self.l1.name().to_string(),
                });
                return Ok(entry);
            }
            Ok(None) => {}
            Err(err) => self.degraded(self.l1.name(), &err),
        }

        if let Some(l2) = &self.l2 {
            match l2.get(key).await {
                Ok(Some(entry)) => {
                    if self.promotable(&entry) {
                        // Promotion failure only costs the next L1 hit.
                        if let Err(err) = self.l1.put(key.clone(), entry.clone()).await {
                            self.degraded(self.l1.name(), &err);
                        }
                        self.metrics.record(MetricEvent::CacheHit {
                            tier: l2.name().to_string(),
                        });
                        return Ok(entry);
                    }
                    // Stale or produced by a different pipeline version.
                    if let Err(err) = l2.remove(key).await {
                        self.degraded(l2.name(), &err);
                    }
                }
                Ok(None) => {}
                Err(err) => self.degraded(l2.name(), &err),
            }
        }

        self.metrics.record(MetricEvent::CacheMiss);
        Err(CacheError::Miss)
    }

    /// Write a response through both tiers.
    ///
    /// Never fails: a tier that rejects the write degrades silently with a
    /// metric event.
    pub async fn put(&self, key: CacheKey, response: ResearchResponse) {
        let entry = CacheEntry::new(response, self.entry_ttl, self.source_version);

        if let Err(err) = self.l1.put(key.clone(), entry.clone()).await {
            self.degraded(self.l1.name(), &err);
        }
        if let Some(l2) = &self.l2 {
            if let Err(err) = l2.put(key, entry).await {
                self.degraded(l2.name(), &err);
            }
        }
    }

    /// Remove an entry from both tiers. Idempotent.
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(err) = self.l1.remove(key).await {
            self.degraded(self.l1.name(), &err);
        }
        if let Some(l2) = &self.l2 {
            if let Err(err) = l2.remove(key).await {
                self.degraded(l2.name(), &err);
            }
        }
    }

    /// Fast-tier statistics.
    pub fn l1_stats(&self) -> CacheStats {
        self.l1.stats()
    }

    /// Slow-tier statistics, if an L2 is attached.
    pub fn l2_stats(&self) -> Option<CacheStats> {
        self.l2.as_ref().map(|l2| l2.stats())
    }

    fn promotable(&self, entry: &CacheEntry) -> bool {
        !entry.is_expired(Utc::now()) && entry.source_version == self.source_version
    }

    fn degraded(&self, tier: &str, err: &CacheError) {
        warn!(tier, error = %err, "cache tier degraded, continuing without it");
        self.metrics.record(MetricEvent::CacheDegraded {
            tier: tier.to_string(),
            reason: err.to_string(),
        });
    }
}

impl std::fmt::Debug for TieredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredStore")
            .field("l1", &self.l1.name())
            .field("l2", &self.l2.as_ref().map(|t| t.name().to_string()))
            .field("entry_ttl", &self.entry_ttl)
            .field("source_version", &self.source_version)
            .finish()
    }
}
