//! Sharded concurrent cache index.
//!
//! The key space is partitioned across independently locked shards, so
//! contention on one key never serializes unrelated keys. Writes to the
//! same key are linearizable through that key's shard lock; no ordering is
//! guaranteed across different keys.
//!
//! A poisoned shard lock is treated as the operation not happening: lookups
//! report a miss and writes report failure, leaving the index observably
//! unchanged. A half-written slot is never visible.

use crate::entry::CacheEntry;
use crate::key::CacheKey;
use fortitude_core::CacheError;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::Ordering;
use std::sync::RwLock;

type Shard = RwLock<HashMap<CacheKey, CacheEntry>>;

/// Concurrency-safe mapping from `CacheKey` to `CacheEntry`.
pub struct CacheIndex {
    shards: Vec<Shard>,
    mask: usize,
}

impl CacheIndex {
    /// Create an index with the given shard count.
    ///
    /// Counts that are not powers of two are rounded up so the shard mask
    /// stays a simple bit-and.
    pub fn new(shard_count: usize) -> Self {
        let count = shard_count.max(1).next_power_of_two();
        let shards = (0..count).map(|_| RwLock::new(HashMap::new())).collect();
        Self {
            shards,
            mask: count - 1,
        }
    }

    fn shard_for(&self, key: &CacheKey) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) & self.mask]
    }

    /// Look up an entry. Read-locks a single shard; never touches others.
    ///
    /// Returns a clone of the entry so callers never alias index storage.
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let shard = self.shard_for(key).read().ok()?;
        shard.get(key).cloned()
    }

    /// Look up an entry and bump its hit counter.
    ///
    /// The counter is atomic, so the bump happens under the same shared
    /// lock as a plain lookup and concurrent touches never serialize.
    pub fn touch(&self, key: &CacheKey) -> Option<CacheEntry> {
        let shard = self.shard_for(key).read().ok()?;
        let entry = shard.get(key)?;
        entry.hit_count.fetch_add(1, Ordering::Relaxed);
        Some(entry.clone())
    }

    /// Atomically insert or fully replace an entry.
    ///
    /// Either the new entry becomes visible in full, or the operation
    /// fails and the previous state remains.
    pub fn upsert(&self, key: CacheKey, entry: CacheEntry) -> Result<(), CacheError> {
        let mut shard = self
            .shard_for(&key)
            .write()
            .map_err(|_| CacheError::TierUnavailable {
                tier: "index".to_string(),
                reason: "shard lock poisoned".to_string(),
            })?;
        shard.insert(key, entry);
        Ok(())
    }

    /// Remove an entry. Safe under concurrent lookups; returns whether an
    /// entry was present.
    pub fn remove(&self, key: &CacheKey) -> bool {
        match self.shard_for(key).write() {
            Ok(mut shard) => shard.remove(key).is_some(),
            Err(_) => false,
        }
    }

    /// Total number of live entries across all shards.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .filter_map(|s| s.read().ok())
            .map(|s| s.len())
            .sum()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&self) {
        for shard in &self.shards {
            if let Ok(mut shard) = shard.write() {
                shard.clear();
            }
        }
    }

    /// Find the key of the oldest entry by creation time.
    ///
    /// Used by the capacity eviction policy. Scans shard-by-shard under
    /// read locks; never holds more than one shard lock at a time.
    pub fn oldest_key(&self) -> Option<CacheKey> {
        let mut oldest: Option<(CacheKey, chrono::DateTime<chrono::Utc>)> = None;
        for shard in &self.shards {
            let Ok(shard) = shard.read() else { continue };
            for (key, entry) in shard.iter() {
                let replace = match &oldest {
                    Some((_, created_at)) => entry.created_at < *created_at,
                    None => true,
                };
                if replace {
                    oldest = Some((key.clone(), entry.created_at));
                }
            }
        }
        oldest.map(|(key, _)| key)
    }
}

impl std::fmt::Debug for CacheIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheIndex")
            .field("shards", &self.shards.len())
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyGenerator;
    use chrono::Utc;
    use fortitude_core::{
        CacheSettings, ProviderId, QualityScore, ResearchRequest, ResearchResponse, ResearchType,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn key_for(topic: &str) -> CacheKey {
        let gen = KeyGenerator::new(CacheSettings::default());
        gen.key(&ResearchRequest::new(topic, ResearchType::Learning))
            .unwrap()
    }

    fn entry_with(content: &str) -> CacheEntry {
        CacheEntry::new(
            ResearchResponse::new(content, ProviderId::new("test"), QualityScore::uniform(0.9)),
            Duration::from_secs(60),
            1,
        )
    }

    #[test]
    fn test_upsert_lookup_roundtrip() {
        let index = CacheIndex::new(16);
        let key = key_for("topic");
        index.upsert(key.clone(), entry_with("value")).unwrap();

        let found = index.lookup(&key).unwrap();
        assert_eq!(found.value.content, "value");
    }

    #[test]
    fn test_upsert_replaces_fully() {
        let index = CacheIndex::new(16);
        let key = key_for("topic");
        index.upsert(key.clone(), entry_with("first")).unwrap();
        index.upsert(key.clone(), entry_with("second")).unwrap();

        assert_eq!(index.lookup(&key).unwrap().value.content, "second");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_tombstones() {
        let index = CacheIndex::new(16);
        let key = key_for("topic");
        index.upsert(key.clone(), entry_with("value")).unwrap();

        assert!(index.remove(&key));
        assert!(index.lookup(&key).is_none());
        assert!(!index.remove(&key), "second remove finds nothing");
    }

    #[test]
    fn test_touch_increments_hit_count() {
        let index = CacheIndex::new(16);
        let key = key_for("topic");
        index.upsert(key.clone(), entry_with("value")).unwrap();

        assert_eq!(index.touch(&key).unwrap().hit_count.load(Ordering::Relaxed), 1);
        assert_eq!(index.touch(&key).unwrap().hit_count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_touch_counts_every_reader() {
        // Touches from many threads all land on the shared counter, and a
        // plain lookup never bumps it.
        let index = Arc::new(CacheIndex::new(8));
        let key = key_for("hot");
        index.upsert(key.clone(), entry_with("value")).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                let key = key.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        index.touch(&key).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let count = |entry: CacheEntry| entry.hit_count.load(Ordering::Relaxed);
        assert_eq!(count(index.lookup(&key).unwrap()), 400);
        assert_eq!(count(index.lookup(&key).unwrap()), 400);
    }

    #[test]
    fn test_shard_count_rounds_up() {
        let index = CacheIndex::new(12);
        assert_eq!(index.shards.len(), 16);
    }

    #[test]
    fn test_oldest_key() {
        let index = CacheIndex::new(4);
        let old_key = key_for("old");
        let mut old_entry = entry_with("old");
        old_entry.created_at = Utc::now() - chrono::Duration::seconds(100);
        index.upsert(old_key.clone(), old_entry).unwrap();
        index.upsert(key_for("new"), entry_with("new")).unwrap();

        assert_eq!(index.oldest_key().unwrap(), old_key);
    }

    #[test]
    fn test_concurrent_upserts_never_torn() {
        // Hammer one key from many threads; every observed value must be
        // one that some thread actually wrote.
        let index = Arc::new(CacheIndex::new(8));
        let key = key_for("contended");

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let index = Arc::clone(&index);
                let key = key.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        index
                            .upsert(key.clone(), entry_with(&format!("writer-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                let key = key.clone();
                std::thread::spawn(move || {
                    for _ in 0..400 {
                        if let Some(entry) = index.lookup(&key) {
                            assert!(entry.value.content.starts_with("writer-"));
                        }
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let last = index.lookup(&key).unwrap();
        assert!(last.value.content.starts_with("writer-"));
    }

    #[test]
    fn test_unrelated_keys_do_not_interfere() {
        let index = Arc::new(CacheIndex::new(16));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    let key = key_for(&format!("topic-{i}"));
                    for n in 0..100 {
                        index
                            .upsert(key.clone(), entry_with(&format!("{i}-{n}")))
                            .unwrap();
                        assert!(index.lookup(&key).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(index.len(), 8);
    }
}
