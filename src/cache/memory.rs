use crate::cache::CacheStats;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: OffsetDateTime,
}

/// Time-boxed key/value store backed by moka with bounded capacity.
///
/// Expiry is lazy: every entry carries an absolute wall-clock deadline set at
/// write time, and the read that finds it past that deadline evicts it.
/// moka shards its storage, so concurrent requests only contend per key.
pub struct TtlCache<V> {
    entries: Cache<String, Arc<CacheEntry<V>>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(default_ttl_seconds: u64, max_capacity: u64) -> Self {
        TtlCache {
            entries: Cache::builder().max_capacity(max_capacity).build(),
            default_ttl: Duration::from_secs(default_ttl_seconds),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let Some(entry) = self.entries.get(key).await else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache miss: {}", key);
            return None;
        };

        if OffsetDateTime::now_utc() > entry.expires_at {
            self.entries.invalidate(key).await;
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache entry expired: {}", key);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Cache hit: {}", key);
        Some(entry.value.clone())
    }

    /// Store `value` under `key`. `ttl` overrides the instance default.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry {
            value,
            expires_at: OffsetDateTime::now_utc() + ttl,
        };
        self.entries.insert(key.into(), Arc::new(entry)).await;
    }

    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses > 0 {
            (hits as f64 / (hits + misses) as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.entries.entry_count(),
            hits,
            misses,
            hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cache_miss() {
        let cache: TtlCache<String> = TtlCache::new(3600, 100);
        assert!(cache.get("nonexistent").await.is_none());
        assert!(!cache.has("nonexistent").await);
    }

    #[tokio::test]
    async fn roundtrip() {
        let cache = TtlCache::new(3600, 100);
        cache.set("key1", vec![1, 2, 3], None).await;

        assert_eq!(cache.get("key1").await, Some(vec![1, 2, 3]));
        assert!(cache.has("key1").await);
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let cache = TtlCache::new(3600, 100);
        cache.set("key1", "old", None).await;
        cache.set("key1", "new", None).await;

        assert_eq!(cache.get("key1").await, Some("new"));
    }

    #[tokio::test]
    async fn per_call_ttl_expiry() {
        let cache = TtlCache::new(3600, 100);
        cache.set("short", 7_u32, Some(Duration::from_secs(1))).await;
        cache.set("long", 8_u32, None).await;

        assert_eq!(cache.get("short").await, Some(7));

        tokio::time::sleep(Duration::from_millis(1_200)).await;

        assert_eq!(cache.get("short").await, None);
        assert!(!cache.has("short").await);
        assert_eq!(cache.get("long").await, Some(8));
    }

    #[tokio::test]
    async fn default_ttl_expiry() {
        let cache = TtlCache::new(1, 100); // 1 second TTL
        cache.set("key1", 1_u8, None).await;

        assert!(cache.get("key1").await.is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(cache.get("key1").await.is_none());
    }

    #[tokio::test]
    async fn stats_tracking() {
        let cache = TtlCache::new(3600, 100);
        cache.set("key1", 1_u8, None).await;

        // 1 miss
        cache.get("missing").await;
        // 2 hits
        cache.get("key1").await;
        cache.get("key1").await;

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 66.666).abs() < 1.0);
    }
}
