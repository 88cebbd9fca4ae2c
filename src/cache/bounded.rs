// Bounded LRU+TTL cache for a single asset generation
// Author: kelexine (https://github.com/kelexine)
//
// Entries live in an `lru::LruCache` (hash map + intrusive recency list), so
// promotion and eviction are O(1). One mutex serializes every operation on a
// generation; overflow handling runs on the guard `set` already holds.
//
// Expired entries are found by a full scan, which only runs once the earliest
// known expiry has passed. Until then an overflowing insert is a single pop.

use super::entry::{ApproxSize, CacheEntry};
use super::models::{hit_rate, CacheStats};
use crate::metrics;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expired: u64,
    total_set: u64,
}

#[derive(Debug)]
struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    counters: Counters,
    approx_bytes: usize,
    /// Lower bound on the earliest `expires_at` among stored entries
    next_expiry: Option<Instant>,
}

enum Lookup<V> {
    Hit(V),
    Expired,
    Absent,
}

/// Removals performed while restoring the capacity invariant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Overflow {
    evicted: usize,
    expired: usize,
}

impl<K: Hash + Eq + Clone, V> Inner<K, V> {
    fn remove_entry(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.pop(key)?;
        self.approx_bytes = self.approx_bytes.saturating_sub(entry.approx_size);
        Some(entry)
    }

    fn insert(&mut self, key: K, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        self.approx_bytes += entry.approx_size;
        self.next_expiry = Some(match self.next_expiry {
            Some(next) => next.min(entry.expires_at),
            None => entry.expires_at,
        });
        let previous = self.entries.put(key, entry)?;
        self.approx_bytes = self.approx_bytes.saturating_sub(previous.approx_size);
        Some(previous)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        match self.next_expiry {
            Some(next) if next <= now => {}
            _ => return 0,
        }

        let mut stale = Vec::new();
        let mut next_expiry: Option<Instant> = None;
        for (key, entry) in self.entries.iter() {
            if entry.is_expired(now) {
                stale.push(key.clone());
            } else {
                let at = entry.expires_at;
                next_expiry = Some(next_expiry.map_or(at, |next| next.min(at)));
            }
        }
        self.next_expiry = next_expiry;

        for key in &stale {
            self.remove_entry(key);
        }
        self.counters.expired += stale.len() as u64;
        stale.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.approx_bytes = 0;
        self.next_expiry = None;
    }

    /// Dead entries go first; only then are live entries evicted from the LRU end.
    ///
    /// With zero capacity the entry just stored is the only one present, and
    /// dropping it counts as an eviction even if it was born expired.
    fn enforce_capacity(&mut self, capacity: usize, now: Instant) -> Overflow {
        let mut overflow = Overflow::default();
        if self.entries.len() <= capacity {
            return overflow;
        }

        if capacity > 0 {
            overflow.expired = self.purge_expired(now);
        }

        while self.entries.len() > capacity {
            match self.entries.pop_lru() {
                Some((_, entry)) => {
                    self.approx_bytes = self.approx_bytes.saturating_sub(entry.approx_size);
                    self.counters.evictions += 1;
                    overflow.evicted += 1;
                }
                None => break,
            }
        }
        overflow
    }
}

/// Thread-safe, fixed-capacity, TTL-aware LRU store.
#[derive(Debug)]
pub struct BoundedCache<K: Hash + Eq, V> {
    name: String,
    capacity: usize,
    default_ttl: Duration,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone + ApproxSize,
{
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is accepted and yields a cache that never retains anything.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            name: "unnamed".to_string(),
            capacity,
            default_ttl,
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                counters: Counters::default(),
                approx_bytes: 0,
                next_expiry: None,
            }),
        }
    }

    /// Label used in logs and metrics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `key`, promoting it to most-recently-used on a hit.
    ///
    /// Expired entries are removed here and reported as misses.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let (lookup, size) = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;

            let lookup = match inner.entries.get_mut(key) {
                None => Lookup::Absent,
                Some(entry) if entry.is_expired(now) => Lookup::Expired,
                Some(entry) => {
                    entry.touch(now);
                    Lookup::Hit(entry.value.clone())
                }
            };

            match &lookup {
                Lookup::Hit(_) => inner.counters.hits += 1,
                Lookup::Expired => {
                    inner.remove_entry(key);
                    inner.counters.expired += 1;
                    inner.counters.misses += 1;
                }
                Lookup::Absent => inner.counters.misses += 1,
            }
            (lookup, inner.entries.len())
        };

        match lookup {
            Lookup::Hit(value) => {
                trace!(cache = %self.name, ?key, "cache hit");
                metrics::record_cache_op(&self.name, "hit");
                Some(value)
            }
            Lookup::Expired => {
                trace!(cache = %self.name, ?key, "cache entry expired");
                metrics::record_cache_op(&self.name, "expired");
                metrics::record_cache_op(&self.name, "miss");
                metrics::update_cache_entries(&self.name, size);
                None
            }
            Lookup::Absent => {
                trace!(cache = %self.name, ?key, "cache miss");
                metrics::record_cache_op(&self.name, "miss");
                None
            }
        }
    }

    /// Store `value` with the cache's default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store `value`, replacing any previous entry for `key` and refreshing its TTL.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry::new(value, now, ttl);

        let (overflow, size) = {
            let mut inner = self.inner.lock();
            inner.counters.total_set += 1;

            let overflow = match inner.insert(key, entry) {
                Some(_) => Overflow::default(),
                None => inner.enforce_capacity(self.capacity, now),
            };
            (overflow, inner.entries.len())
        };

        metrics::record_cache_op(&self.name, "set");
        if overflow.evicted > 0 {
            debug!(
                cache = %self.name,
                evicted = overflow.evicted,
                "evicted least-recently-used entries"
            );
            metrics::record_cache_ops(&self.name, "eviction", overflow.evicted);
        }
        if overflow.expired > 0 {
            metrics::record_cache_ops(&self.name, "expired", overflow.expired);
        }
        metrics::update_cache_entries(&self.name, size);
    }

    /// Drop `key` without counting an eviction.
    pub fn remove(&self, key: &K) -> Option<V> {
        let (removed, size) = {
            let mut inner = self.inner.lock();
            let removed = inner.remove_entry(key).map(|entry| entry.value);
            (removed, inner.entries.len())
        };
        metrics::update_cache_entries(&self.name, size);
        removed
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let (purged, size) = {
            let mut inner = self.inner.lock();
            let purged = inner.purge_expired(now);
            (purged, inner.entries.len())
        };

        if purged > 0 {
            debug!(cache = %self.name, purged, "purged expired entries");
            metrics::record_cache_ops(&self.name, "expired", purged);
        }
        metrics::update_cache_entries(&self.name, size);
        purged
    }

    /// Empty the cache. Statistics counters are kept.
    pub fn clear(&self) {
        self.inner.lock().clear();
        debug!(cache = %self.name, "cache cleared");
        metrics::update_cache_entries(&self.name, 0);
    }

    /// Zero the statistics counters without touching the entries.
    pub fn reset_stats(&self) {
        self.inner.lock().counters = Counters::default();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let c = inner.counters;
        CacheStats {
            hits: c.hits,
            misses: c.misses,
            evictions: c.evictions,
            expired: c.expired,
            total_set: c.total_set,
            size: inner.entries.len(),
            max_size: self.capacity,
            default_ttl_seconds: self.default_ttl.as_secs_f64(),
            approx_bytes: inner.approx_bytes,
            hit_rate: hit_rate(c.hits, c.misses),
        }
    }
}
