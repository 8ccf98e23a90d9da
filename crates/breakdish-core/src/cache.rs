// Caller-owned memo table for computed aggregates.
//
// The engine itself never caches: every call recomputes from its inputs.
// Hosts that render the same view repeatedly keep one of these keyed by the
// version of the dataset they loaded, and drop stale versions on reload.

use std::collections::HashMap;

use tracing::debug;

/// Cache key: which dataset snapshot, and which team or player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset_version: u64,
    pub id: String,
}

#[derive(Debug)]
pub struct AggregateCache<V> {
    entries: HashMap<CacheKey, V>,
}

impl<V> Default for AggregateCache<V> {
    fn default() -> Self {
        AggregateCache {
            entries: HashMap::new(),
        }
    }
}

impl<V> AggregateCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `(dataset_version, id)`, computing and
    /// storing it first if absent.
    pub fn get_or_insert_with<F>(&mut self, dataset_version: u64, id: &str, compute: F) -> &V
    where
        F: FnOnce() -> V,
    {
        let key = CacheKey {
            dataset_version,
            id: id.to_string(),
        };
        self.entries.entry(key).or_insert_with(compute)
    }

    pub fn get(&self, dataset_version: u64, id: &str) -> Option<&V> {
        self.entries.get(&CacheKey {
            dataset_version,
            id: id.to_string(),
        })
    }

    /// Drop every entry computed from `dataset_version`.
    pub fn invalidate_version(&mut self, dataset_version: u64) {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.dataset_version != dataset_version);
        debug!(
            "invalidated {} cached aggregates for dataset version {}",
            before - self.entries.len(),
            dataset_version
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_once_per_key() {
        let mut cache = AggregateCache::new();
        let mut calls = 0;
        let v = *cache.get_or_insert_with(1, "jo smith", || {
            calls += 1;
            42
        });
        assert_eq!(v, 42);
        let v = *cache.get_or_insert_with(1, "jo smith", || {
            calls += 1;
            7
        });
        assert_eq!(v, 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn versions_are_independent() {
        let mut cache = AggregateCache::new();
        cache.get_or_insert_with(1, "crown", || 1);
        cache.get_or_insert_with(2, "crown", || 2);
        assert_eq!(cache.len(), 2);

        cache.invalidate_version(1);
        assert!(cache.get(1, "crown").is_none());
        assert_eq!(cache.get(2, "crown"), Some(&2));
    }
}
