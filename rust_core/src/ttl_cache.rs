//! Short-TTL in-memory cache for third-party lookups.
//!
//! One process-wide instance fronts profile and status lookups to bound
//! outbound call volume. Entries expire and are refetched lazily; nothing
//! is proactively invalidated because staleness within the TTL window is
//! acceptable.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent TTL cache. Requires no transactional guarantees: readers may
/// observe a value up to one TTL window stale.
pub struct TtlCache<K, V> {
    entries: RwLock<FxHashMap<K, Entry<V>>>,
    default_ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            default_ttl,
        }
    }

    /// Fetch a live entry; expired entries read as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        (entry.expires_at > Instant::now()).then(|| entry.value.clone())
    }

    /// Insert with the default TTL.
    pub fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.write();
        // Writes are rare relative to reads; piggyback dead-entry cleanup
        // on them so the map cannot grow without bound.
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_before_expiry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.put("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
    }

    #[test]
    fn test_miss_after_expiry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.put_with_ttl("a".to_string(), 1, Duration::ZERO);
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_overwrite_refreshes_value() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.put("a".to_string(), 1);
        cache.put("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_write_purges_expired_entries() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.put_with_ttl("dead".to_string(), 1, Duration::ZERO);
        cache.put("live".to_string(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_read_insert() {
        use std::sync::Arc;
        let cache: Arc<TtlCache<u32, u32>> = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for n in 0..100 {
                        cache.put(i * 100 + n, n);
                        let _ = cache.get(&(i * 100 + n));
                    }
                })
            })
            .collect();
        for handle in writers {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
