//! LRU cache of decoded tiles.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

/// (image level, linear tile index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub level: usize,
    pub tile: usize,
}

/// Decoded tile samples keyed by [`TileKey`], with hit/miss counters.
pub struct TileCache {
    inner: LruCache<TileKey, Arc<Vec<f32>>>,
    hits: u64,
    misses: u64,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner: LruCache::new(cap), hits: 0, misses: 0 }
    }

    pub fn get(&mut self, key: &TileKey) -> Option<Arc<Vec<f32>>> {
        match self.inner.get(key) {
            Some(tile) => {
                self.hits += 1;
                Some(Arc::clone(tile))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.inner.contains(key)
    }

    pub fn insert(&mut self, key: TileKey, samples: Vec<f32>) -> Arc<Vec<f32>> {
        let tile = Arc::new(samples);
        self.inner.put(key, Arc::clone(&tile));
        tile
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_and_stats() {
        let mut cache = TileCache::new(2);
        let key = |tile| TileKey { level: 0, tile };
        cache.insert(key(0), vec![1.0]);
        cache.insert(key(1), vec![2.0]);
        assert_eq!(cache.get(&key(0)).as_deref(), Some(&vec![1.0]));
        cache.insert(key(2), vec![3.0]); // evicts tile 1, the least recently used

        assert!(cache.get(&key(1)).is_none());
        assert!(cache.contains(&key(0)));
        assert!(cache.contains(&key(2)));
        assert_eq!(cache.stats(), (1, 1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut cache = TileCache::new(0);
        cache.insert(TileKey { level: 1, tile: 3 }, vec![0.5]);
        assert_eq!(cache.len(), 1);
    }
}
