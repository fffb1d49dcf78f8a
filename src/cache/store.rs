//! Cache Store Module
//!
//! Response cache combining HashMap storage with FIFO eviction and lazy TTL expiry.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, InsertionOrder};
use crate::models::ApiResponse;

// == Cache Store ==
/// Bounded, TTL-based store for idempotent read responses.
///
/// The store is best-effort: neither lookup nor store can fail.
#[derive(Debug)]
pub struct CacheStore {
    /// Fingerprint -> cached response
    entries: HashMap<String, CacheEntry>,
    /// Insertion order used for eviction
    order: InsertionOrder,
    stats: CacheStats,
    max_entries: usize,
    ttl: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity and entry lifetime.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            stats: CacheStats::new(),
            max_entries,
            ttl,
        }
    }

    // == Lookup ==
    /// Returns the live response stored under `key`.
    ///
    /// An expired entry is removed as a side effect and reported as absent.
    pub fn lookup(&mut self, key: &str) -> Option<ApiResponse> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(self.ttl),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.order.remove(key);
            self.stats.record_expiration();
            self.stats.set_total_entries(self.entries.len());
            debug!(key, "cache entry expired");
            return None;
        }

        self.stats.record_hit();
        self.entries.get(key).map(|entry| {
            debug!(key, remaining = ?entry.ttl_remaining(self.ttl), "cache hit");
            entry.payload.clone()
        })
    }

    // == Store ==
    /// Inserts or overwrites the response under `key`.
    ///
    /// Overwriting restarts the entry's lifetime and makes it the newest
    /// insertion. When a new key pushes the store past capacity, the single
    /// oldest-inserted entry is evicted; reads never protect an entry.
    pub fn store(&mut self, key: String, payload: ApiResponse) {
        if self.max_entries == 0 {
            return;
        }

        self.entries.insert(key.clone(), CacheEntry::new(payload));
        self.order.record(&key);

        if self.entries.len() > self.max_entries {
            if let Some(evicted) = self.order.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "cache entry evicted");
            }
        }

        self.stats.set_total_entries(self.entries.len());
    }

    // == Clear ==
    /// Drops every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(300);

    fn payload(n: u64) -> ApiResponse {
        ApiResponse::ok(json!({ "n": n }))
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, TTL);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.ttl(), TTL);
    }

    #[test]
    fn test_store_and_lookup() {
        let mut store = CacheStore::new(100, TTL);

        store.store("GET /users".to_string(), payload(1));

        assert_eq!(store.lookup("GET /users"), Some(payload(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_lookup_missing() {
        let mut store = CacheStore::new(100, TTL);
        assert_eq!(store.lookup("GET /nothing"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(100, TTL);

        store.store("k".to_string(), payload(1));
        store.store("k".to_string(), payload(2));

        assert_eq!(store.lookup("k"), Some(payload(2)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_scenario_hit_then_expire() {
        let mut store = CacheStore::new(100, TTL);
        let key = "GET /reports?month=1".to_string();

        store.store(key.clone(), payload(1));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(store.lookup(&key), Some(payload(1)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.lookup(&key), None);
        assert!(!store.contains(&key), "expired entry should be purged");
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_restarts_lifetime() {
        let mut store = CacheStore::new(100, TTL);

        store.store("k".to_string(), payload(1));
        tokio::time::advance(Duration::from_secs(200)).await;
        store.store("k".to_string(), payload(2));
        tokio::time::advance(Duration::from_secs(200)).await;

        assert_eq!(store.lookup("k"), Some(payload(2)));
    }

    #[test]
    fn test_capacity_evicts_oldest_inserted() {
        let mut store = CacheStore::new(100, TTL);

        for i in 0..100 {
            store.store(format!("key{}", i), payload(i));
        }
        assert_eq!(store.len(), 100);

        store.store("key100".to_string(), payload(100));

        assert_eq!(store.len(), 100);
        assert!(!store.contains("key0"));
        assert!(store.contains("key1"));
        assert!(store.contains("key100"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_reads_do_not_protect_from_eviction() {
        let mut store = CacheStore::new(3, TTL);

        store.store("key1".to_string(), payload(1));
        store.store("key2".to_string(), payload(2));
        store.store("key3".to_string(), payload(3));

        // FIFO, not LRU: reading key1 does not save it
        store.lookup("key1");
        store.store("key4".to_string(), payload(4));

        assert!(!store.contains("key1"));
        assert!(store.contains("key2"));
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut store = CacheStore::new(2, TTL);

        store.store("a".to_string(), payload(1));
        store.store("b".to_string(), payload(2));
        store.store("a".to_string(), payload(3));

        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut store = CacheStore::new(0, TTL);
        store.store("a".to_string(), payload(1));
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut store = CacheStore::new(10, TTL);
        store.store("a".to_string(), payload(1));
        store.store("b".to_string(), payload(2));

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.lookup("a"), None);
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(100, TTL);

        store.store("key1".to_string(), payload(1));
        store.lookup("key1"); // hit
        store.lookup("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
