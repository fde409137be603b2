use indexmap::IndexMap;
use std::hash::Hash;

use super::types::CacheStats;
use crate::constants::DEFAULT_ANALYSIS_CACHE_CAPACITY;

/// Bounded cache that evicts the least-recently-inserted entry.
///
/// Reads never reorder entries, so eviction order depends only on the order
/// of `set` calls. Replacing an existing key counts as a fresh insertion.
#[derive(Debug)]
pub struct ContentAddressedCache<K, V> {
    entries: IndexMap<K, V>,
    capacity: usize,
    stats: CacheStats,
}

impl<K, V> Default for ContentAddressedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_ANALYSIS_CACHE_CAPACITY)
    }
}

impl<K, V> ContentAddressedCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Look up a value, counting a hit or a miss
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_valid(key, |_| true)
    }

    /// Look up a value that also satisfies `is_valid`.
    ///
    /// An entry that fails the check counts as a miss and stays in place;
    /// the next `set` for the key supersedes it.
    pub fn get_valid<F>(&mut self, key: &K, is_valid: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool,
    {
        match self.entries.get(key) {
            Some(value) if is_valid(value) => {
                self.stats.hits += 1;
                Some(value.clone())
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Read a value without touching counters
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Insert or replace a value, evicting the oldest insertion when full
    pub fn set(&mut self, key: K, value: V) {
        let replaced = self.entries.shift_remove(&key).is_some();
        if !replaced && self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
            self.stats.evictions += 1;
        }
        self.entries.insert(key, value);
        debug_assert!(self.entries.len() <= self.capacity);
    }

    /// Remove a single entry, returning whether it existed
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
