//! Chunk-Count Cache
//!
//! Every increment and every aggregation needs the chunk layout (count and
//! generation) of its logical key. The layout lives in a small record object,
//! so reading it on every call would double the substrate round trips of the
//! hot path. This cache keeps recently used layouts in an LRU with a TTL.
//!
//! ## Consistency
//!
//! A repartition in this process updates the cache directly. A repartition
//! in another process becomes visible here once the entry expires, so
//! `ttl_ms` bounds how long this process may keep addressing the old layout.
//!
//! ## Configuration
//!
//! ```ignore
//! let cache = ChunkCountCache::new(CacheConfig {
//!     capacity: 10_000,
//!     ttl_ms: 30_000,
//! });
//! ```

use historydb_core::ChunkLayout;
use historydb_observability::metrics;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Cache entry with TTL
#[derive(Clone, Copy)]
struct CacheEntry {
    layout: ChunkLayout,
    expires_at: i64, // Timestamp in milliseconds
}

impl CacheEntry {
    fn new(layout: ChunkLayout, ttl_ms: i64) -> Self {
        Self {
            layout,
            expires_at: now_ms().saturating_add(ttl_ms),
        }
    }

    fn is_expired(&self) -> bool {
        now_ms() >= self.expires_at
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of logical keys to remember (default: 10,000)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// TTL for entries in milliseconds (default: 30 seconds)
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: i64,
}

fn default_capacity() -> usize {
    10_000
}

fn default_ttl_ms() -> i64 {
    30 * 1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_ms: default_ttl_ms(),
        }
    }
}

pub struct ChunkCountCache {
    entries: RwLock<LruCache<String, CacheEntry>>,
    ttl_ms: i64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ChunkCountCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            ttl_ms: config.ttl_ms,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached layout for `key`, dropping it if expired.
    pub async fn get(&self, key: &str) -> Option<ChunkLayout> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired() {
                let layout = entry.layout;
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::CACHE_HITS_TOTAL.inc();
                return Some(layout);
            }
            entries.pop(key);
            metrics::CACHE_ENTRIES.set(entries.len() as i64);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::CACHE_MISSES_TOTAL.inc();
        None
    }

    pub async fn insert(&self, key: &str, layout: ChunkLayout) {
        let mut entries = self.entries.write().await;
        entries.put(key.to_string(), CacheEntry::new(layout, self.ttl_ms));
        metrics::CACHE_ENTRIES.set(entries.len() as i64);
    }

    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.pop(key);
        metrics::CACHE_ENTRIES.set(entries.len() as i64);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        metrics::CACHE_ENTRIES.set(0);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let total = hits + misses;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }
}

impl Default for ChunkCountCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(count: u32) -> ChunkLayout {
        ChunkLayout::initial(count)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = ChunkCountCache::default();
        assert_eq!(cache.get("k").await, None);

        cache.insert("k", layout(8)).await;
        assert_eq!(cache.get("k").await, Some(layout(8)));

        cache.insert("k", layout(2)).await;
        assert_eq!(cache.get("k").await, Some(layout(2)));
        assert!((cache.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache = ChunkCountCache::new(CacheConfig {
            capacity: 16,
            ttl_ms: 0,
        });
        cache.insert("k", layout(8)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = ChunkCountCache::new(CacheConfig {
            capacity: 2,
            ttl_ms: 60_000,
        });
        cache.insert("a", layout(1)).await;
        cache.insert("b", layout(2)).await;
        cache.get("a").await;
        cache.insert("c", layout(3)).await;

        assert_eq!(cache.get("a").await, Some(layout(1)));
        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("c").await, Some(layout(3)));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = ChunkCountCache::default();
        cache.insert("k", layout(4)).await;
        cache.invalidate("k").await;
        assert_eq!(cache.get("k").await, None);
    }
}
