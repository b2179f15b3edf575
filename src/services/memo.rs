//! Single-slot memoization for derived timeline data
//!
//! The view recomputes filtering, grouping and view-models only when its key
//! (records generation plus criteria) differs from the cached one.

use std::time::{Duration, Instant};

/// Cached value with the key it was computed from
#[derive(Debug, Clone)]
struct MemoEntry<K, V> {
    key: K,
    value: V,
    computed_at: Instant,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct Memo<K, V> {
    entry: Option<MemoEntry<K, V>>,
    stats: MemoStats,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            entry: None,
            stats: MemoStats::default(),
        }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing it on a miss
    pub fn get_or_compute<F>(&mut self, key: K, compute: F) -> &V
    where
        F: FnOnce() -> V,
    {
        let fresh = matches!(self.entry, Some(ref entry) if entry.key == key);
        if fresh {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            self.entry = None;
        }

        let entry = self.entry.get_or_insert_with(|| MemoEntry {
            key,
            value: compute(),
            computed_at: Instant::now(),
        });
        &entry.value
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Age of the cached value, if any
    pub fn age(&self) -> Option<Duration> {
        self.entry.as_ref().map(|entry| entry.computed_at.elapsed())
    }

    pub fn stats(&self) -> MemoStats {
        self.stats
    }
}
