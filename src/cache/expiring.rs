use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::foundation::config::CacheConfig;

/// Rough in-memory footprint of a cached value, used for memory metrics only.
pub trait EstimateSize {
    /// Approximate heap + inline bytes.
    fn estimated_bytes(&self) -> usize;
}

impl EstimateSize for String {
    fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.len()
    }
}

impl EstimateSize for Vec<u8> {
    fn estimated_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.len()
    }
}

impl<T: EstimateSize + ?Sized> EstimateSize for Arc<T> {
    fn estimated_bytes(&self) -> usize {
        (**self).estimated_bytes()
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    data: V,
    created_at: Instant,
    ttl: Duration,
    access_count: u64,
    last_accessed_at: Instant,
    // Monotonic access sequence. Instants can tie (coarse clocks, paused test time), the
    // sequence never does.
    last_access_seq: u64,
    approx_bytes: usize,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

/// Point-in-time cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing (or only an expired entry).
    pub misses: u64,
    /// Entries removed to get back under capacity.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
    /// Live entry count.
    pub size: usize,
    /// Sum of the entries' estimated sizes.
    pub approximate_memory_bytes: usize,
    /// `hits / (hits + misses)`, `0.0` before any lookup.
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    counters: Counters,
    seq: u64,
}

impl<V> CacheState<V> {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

/// String-keyed store with per-entry TTL and least-recently-accessed eviction.
///
/// Expired entries are never returned; they are dropped lazily when touched and eagerly on every
/// [`ExpiringCache::set`] maintenance pass.
#[derive(Debug)]
pub struct ExpiringCache<V> {
    name: &'static str,
    max_entries: usize,
    default_ttl: Duration,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone + EstimateSize> ExpiringCache<V> {
    /// Create an empty cache. `name` only shows up in logs.
    pub fn new(name: &'static str, config: &CacheConfig) -> Self {
        Self {
            name,
            max_entries: config.max_entries.max(1),
            default_ttl: config.ttl(),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                counters: Counters::default(),
                seq: 0,
            }),
        }
    }

    /// Default TTL applied by [`ExpiringCache::set`].
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a live entry, bumping its access bookkeeping.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = self.state.lock();

        let Some(expired) = state.entries.get(key).map(|e| e.is_expired(now)) else {
            state.counters.misses += 1;
            return None;
        };
        if expired {
            state.entries.remove(key);
            state.counters.expirations += 1;
            state.counters.misses += 1;
            tracing::debug!(cache = self.name, key, "expired on read");
            return None;
        }

        let seq = state.next_seq();
        state.counters.hits += 1;
        let entry = state.entries.get_mut(key)?;
        entry.access_count += 1;
        entry.last_accessed_at = now;
        entry.last_access_seq = seq;
        Some(entry.data.clone())
    }

    /// Insert with the default TTL, then run a maintenance pass.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL, then run a maintenance pass.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let approx_bytes = value.estimated_bytes();
        {
            let mut state = self.state.lock();
            let seq = state.next_seq();
            state.entries.insert(
                key.into(),
                CacheEntry {
                    data: value,
                    created_at: now,
                    ttl,
                    access_count: 0,
                    last_accessed_at: now,
                    last_access_seq: seq,
                    approx_bytes,
                },
            );
        }
        self.evict_expired();
        self.evict_lru_until_within_capacity();
    }

    /// Remove one entry. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, e| !e.is_expired(now));
        let removed = before - state.entries.len();
        state.counters.expirations += removed as u64;
        if removed > 0 {
            tracing::debug!(cache = self.name, removed, "expired entries evicted");
        }
        removed
    }

    /// Remove least-recently-accessed entries until the cache is at or under capacity.
    pub fn evict_lru_until_within_capacity(&self) -> usize {
        let mut state = self.state.lock();
        let mut removed = 0usize;
        while state.entries.len() > self.max_entries {
            let victim = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access_seq)
                .map(|(k, _)| k.clone())
                .or_else(|| state.entries.keys().next().cloned());
            let Some(victim) = victim else {
                break;
            };
            state.entries.remove(&victim);
            state.counters.evictions += 1;
            removed += 1;
        }
        if removed > 0 {
            tracing::debug!(cache = self.name, removed, "lru entries evicted");
        }
        removed
    }

    /// Drop all entries. Counters are kept.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Zero the hit/miss/eviction/expiration counters.
    pub fn reset_metrics(&self) {
        self.state.lock().counters = Counters::default();
    }

    /// Number of stored entries (including not-yet-collected expired ones).
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access count of a stored entry, without touching it.
    pub fn access_count(&self, key: &str) -> Option<u64> {
        self.state.lock().entries.get(key).map(|e| e.access_count)
    }

    /// When a stored entry was last read (or written), without touching it.
    pub fn last_accessed_at(&self, key: &str) -> Option<Instant> {
        self.state.lock().entries.get(key).map(|e| e.last_accessed_at)
    }

    /// Snapshot the counters.
    pub fn metrics(&self) -> CacheMetrics {
        let state = self.state.lock();
        let c = &state.counters;
        let lookups = c.hits + c.misses;
        CacheMetrics {
            hits: c.hits,
            misses: c.misses,
            evictions: c.evictions,
            expirations: c.expirations,
            size: state.entries.len(),
            approximate_memory_bytes: state.entries.values().map(|e| e.approx_bytes).sum(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                c.hits as f64 / lookups as f64
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/expiring.rs"]
mod tests;
