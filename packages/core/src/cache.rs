//! Bounded result cache with FIFO eviction.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Key for a cached result: a 64-bit digest of (task type, serialized input).
pub type CacheKey = u64;

/// Bounded key -> result store, evicting the oldest entry first.
///
/// The insertion-order queue and the entry map move together: a key is in
/// `order` exactly when it is in `entries`.
#[derive(Debug)]
pub struct ResultCache {
    enabled: bool,
    capacity: usize,
    entries: HashMap<CacheKey, serde_json::Value>,
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    /// Create a cache with the given capacity. A disabled cache accepts
    /// every call as a no-op.
    pub fn new(enabled: bool, capacity: usize) -> Self {
        Self {
            enabled,
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Compute the cache key for a (task type, payload) pair.
    pub fn key(task_type: &str, payload: &serde_json::Value) -> CacheKey {
        let mut hasher = DefaultHasher::new();
        task_type.hash(&mut hasher);
        payload.to_string().hash(&mut hasher);
        hasher.finish()
    }

    /// Look up a cached result, counting a hit or a miss.
    pub fn lookup(&mut self, key: CacheKey) -> Option<serde_json::Value> {
        if !self.enabled {
            return None;
        }
        match self.entries.get(&key) {
            Some(value) => {
                self.hits += 1;
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a result, evicting the oldest entry when at capacity.
    pub fn insert(&mut self, key: CacheKey, value: serde_json::Value) {
        if !self.enabled {
            return;
        }
        if self.entries.insert(key, value).is_some() {
            // Refreshed an existing key; its slot in the order queue stands.
            return;
        }
        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    /// Drop all entries and reset the hit/miss counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hits recorded since construction or the last clear.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Misses recorded since construction or the last clear.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hit rate over all lookups, if any were made.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        if total == 0 {
            None
        } else {
            Some(self.hits as f64 / total as f64)
        }
    }
}
