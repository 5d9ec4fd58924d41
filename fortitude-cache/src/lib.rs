//! Fortitude Cache - deterministic keys and tiered storage.
//!
//! This crate implements the look-aside cache that sits in front of the
//! provider fallback engine.
//!
//! # Design Philosophy
//!
//! Two production lessons shape this module:
//!
//! 1. A single coarse lock around the cache map once produced lost updates
//!    under load. The index is therefore sharded: contention on one key
//!    never serializes unrelated keys.
//! 2. Floating-point confidence values leaked into cache keys and caused
//!    spurious misses from numerical noise. Confidence is therefore
//!    quantized into fixed-width bands *before* any serialization or
//!    hashing.
//!
//! The cache is strictly an optimization: any tier failure degrades to a
//! miss with a metric event, and never reaches the caller as an error.

pub mod entry;
pub mod index;
pub mod key;
pub mod tier;
pub mod tiered;

pub use entry::{CacheEntry, CacheStats};
pub use index::CacheIndex;
pub use key::{CacheKey, KeyGenerator};
pub use tier::{CacheTier, FlakyTier, MemoryTier};
pub use tiered::TieredStore;
