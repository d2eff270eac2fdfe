//! Shared response cache.
//!
//! One cache instance is shared by every fetch session in the process for
//! its entire lifetime. Entries are immutable once stored and are only
//! ever replaced wholesale (insert-or-replace) or removed by explicit
//! invalidation; there is no cache-level TTL because staleness is decided
//! per resolve call against the entry's timestamp.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tokio::time::Instant;

use super::key::CacheKey;

/// Default staleness window: cached entries younger than this are served
/// without a network call.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of cached entries.
const DEFAULT_MAX_CAPACITY: u64 = 1000;

/// A cached payload with its storage timestamp.
///
/// Never mutated after insertion; the whole entry is replaced as a unit.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The fetched payload, stored opaquely.
    pub payload: Arc<serde_json::Value>,

    /// When the entry was stored. `tokio::time::Instant` so tests with a
    /// paused clock can age entries deterministically.
    pub stored_at: Instant,
}

impl CacheEntry {
    /// Create an entry timestamped now.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload: Arc::new(payload),
            stored_at: Instant::now(),
        }
    }

    /// Whether the entry is younger than the given staleness window.
    pub fn is_fresh(&self, staleness: Duration) -> bool {
        self.stored_at.elapsed() < staleness
    }
}

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

/// Process-wide cache of fetched payloads, keyed by [`CacheKey`].
///
/// Cheap to clone; clones share the same underlying store.
#[derive(Clone)]
pub struct ResponseCache {
    entries: MokaCache<CacheKey, CacheEntry>,
}

impl ResponseCache {
    /// Create a cache with the given configuration.
    pub fn new(config: &ResponseCacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .build();

        Self { entries }
    }

    /// Look up an entry. Returns a clone; the stored entry is never
    /// handed out mutably.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).await
    }

    /// Insert or replace the entry for a key.
    pub async fn insert(&self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry).await;
    }

    /// Remove the entry for a key, if present.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key).await;
    }

    /// Remove all entries.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Number of cached entries (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&ResponseCacheConfig::default())
    }
}
