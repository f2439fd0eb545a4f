use image::DynamicImage;
use lru::LruCache;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::tiles::request::CacheKey;

/// Memory an entry occupies in the cache, in bytes
pub trait CacheCost {
    fn cache_cost(&self) -> usize;
}

impl CacheCost for DynamicImage {
    fn cache_cost(&self) -> usize {
        self.as_bytes().len()
    }
}

impl CacheCost for Vec<u8> {
    fn cache_cost(&self) -> usize {
        self.len()
    }
}

impl<T: CacheCost + ?Sized> CacheCost for Arc<T> {
    fn cache_cost(&self) -> usize {
        (**self).cache_cost()
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    cost: usize,
}

#[derive(Debug)]
struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, Entry<V>>,
    used: usize,
}

/// LRU cache bounded by the summed cost of its entries rather than their count.
///
/// Inserting evicts least-recently-used entries until the new one fits. An
/// entry costing more than the whole budget is not cached at all.
#[derive(Debug)]
pub struct TileCache<K: Hash + Eq = CacheKey, V = Arc<DynamicImage>> {
    inner: Arc<Mutex<Inner<K, V>>>,
    budget: usize,
}

impl<K: Hash + Eq, V: Clone + CacheCost> TileCache<K, V> {
    /// Create a new tile cache holding at most `budget` bytes
    pub fn new(budget: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: LruCache::unbounded(),
                used: 0,
            })),
            budget,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get an entry, marking it as most recently used
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert an entry, evicting as needed. Returns whether it was stored.
    pub fn put(&self, key: K, value: V) -> bool {
        let cost = value.cache_cost();
        if cost > self.budget {
            log::debug!(
                "not caching entry of {} bytes, budget is {} bytes",
                cost,
                self.budget
            );
            return false;
        }

        let mut inner = self.lock();
        if let Some(previous) = inner.entries.pop(&key) {
            inner.used -= previous.cost;
        }

        while inner.used + cost > self.budget {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.used -= evicted.cost,
                None => break,
            }
        }

        inner.used += cost;
        inner.entries.put(key, Entry { value, cost });
        true
    }

    /// Check if an entry is cached without touching its recency
    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains(key)
    }

    /// Remove an entry from the cache
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let entry = inner.entries.pop(key)?;
        inner.used -= entry.cost;
        Some(entry.value)
    }

    /// Clear all entries
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.used = 0;
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summed cost of all cached entries
    pub fn used(&self) -> usize {
        self.lock().used
    }

    /// Configured cost budget
    pub fn budget(&self) -> usize {
        self.budget
    }
}

impl<K: Hash + Eq, V> Clone for TileCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            budget: self.budget,
        }
    }
}
