//! Cache tier trait and implementations.
//!
//! A tier is one level of the tiered store. The trait is async because
//! slower tiers (disk, network) suspend on I/O; the in-memory tier
//! completes synchronously inside its methods and never suspends.

use crate::entry::CacheEntry;
use crate::index::CacheIndex;
use crate::key::CacheKey;
use async_trait::async_trait;
use chrono::Utc;
use fortitude_core::CacheError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One level of the tiered cache.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Name of this tier, used in metrics and degraded-mode events.
    fn name(&self) -> &str;

    /// Get an entry. `Ok(None)` is a miss; `Err` means the tier itself
    /// failed and the store should degrade around it.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace an entry.
    async fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<(), CacheError>;

    /// Remove an entry, reporting whether one was present.
    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Usage statistics for this tier.
    fn stats(&self) -> crate::entry::CacheStats;
}

/// In-memory tier backed by the sharded index.
///
/// Bounded by `capacity`: inserting beyond it evicts the oldest entry by
/// creation time. Expired entries are dropped on read.
pub struct MemoryTier {
    name: String,
    index: CacheIndex,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryTier {
    /// Create a tier with the given name, shard count, and capacity.
    pub fn new(name: impl Into<String>, shard_count: usize, capacity: usize) -> Self {
        Self {
            name: name.into(),
            index: CacheIndex::new(shard_count),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the tier is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl CacheTier for MemoryTier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        match self.index.touch(key) {
            Some(entry) if entry.is_expired(Utc::now()) => {
                self.index.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<(), CacheError> {
        let replacing = self.index.lookup(&key).is_some();
        if !replacing && self.index.len() >= self.capacity {
            if let Some(oldest) = self.index.oldest_key() {
                if self.index.remove(&oldest) {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        self.index.upsert(key, entry)
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.index.remove(key))
    }

    fn stats(&self) -> crate::entry::CacheStats {
        crate::entry::CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.index.len() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("entries", &self.index.len())
            .finish()
    }
}

/// Tier wrapper that can be switched into a failing mode.
///
/// Used by tests to simulate an unavailable slow tier; every operation
/// returns `TierUnavailable` while failing.
pub struct FlakyTier {
    inner: MemoryTier,
    failing: AtomicBool,
}

impl FlakyTier {
    /// Wrap an in-memory tier, initially passing everything through.
    pub fn new(inner: MemoryTier) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    /// Switch failure simulation on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::TierUnavailable {
                tier: self.inner.name().to_string(),
                reason: "simulated I/O failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheTier for FlakyTier {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn put(&self, key: CacheKey, entry: CacheEntry) -> Result<(), CacheError> {
        self.check()?;
        self.inner.put(key, entry).await
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.check()?;
        self.inner.remove(key).await
    }

    fn stats(&self) -> crate::entry::CacheStats {
        self.inner.stats()
    }
}
