//! LazyCache implementation with compute-at-most-once semantics.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::error::CacheError;
use super::types::{CacheEntry, CacheStats};
use crate::config::CacheConfig;

/// Memoizing key-value cache with lazy population.
///
/// A value is computed the first time its key is requested and served from
/// memory afterwards. The cache owns its entries and hands out clones, so wrap
/// large values in `Arc`. There is no eviction: entries live as long as the
/// cache.
///
/// Computation happens while holding the write lock, after a second lookup,
/// so a key is computed at most once even when the cache is shared between
/// threads. A compute function must therefore not call back into the same
/// cache.
#[derive(Debug)]
pub struct LazyCache<K, V> {
    /// The cache storage (key -> resolved entry).
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    failed_computations: AtomicU64,
}

impl<K, V> Default for LazyCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> LazyCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty cache with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failed_computations: AtomicU64::new(0),
        }
    }

    /// Create an empty cache sized from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_capacity(config.initial_capacity)
    }

    /// Get the value for `key`, computing and storing it on the first request.
    ///
    /// On a hit `compute` is not called. On a miss it is called exactly once
    /// with the key; a successful result is stored and returned.
    ///
    /// # Errors
    /// Returns `CacheError::ComputeFailed` if `compute` fails. Nothing is
    /// stored in that case, so a later call for the same key computes again.
    pub fn get_or_compute<F, E>(&self, key: K, compute: F) -> Result<V, CacheError<K, E>>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }

        let mut entries = self.write();

        // Another caller may have filled the entry while we waited for the lock.
        if let Some(entry) = entries.get(&key) {
            entry.touch();
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.value().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(size = entries.len(), "Cache miss, computing value");

        match compute(&key) {
            Ok(value) => {
                entries.insert(key, CacheEntry::new(value.clone()));
                debug!(size = entries.len(), "Value cached");
                Ok(value)
            }
            Err(error) => {
                self.failed_computations.fetch_add(1, Ordering::Relaxed);
                warn!(size = entries.len(), "Computation failed, nothing cached");
                Err(CacheError::ComputeFailed { key, error })
            }
        }
    }

    /// Get the value for `key`, computing it with an infallible function on a miss.
    pub fn get_or_init<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        match self.get_or_compute(key, |k| Ok::<V, Infallible>(init(k))) {
            Ok(value) => value,
            Err(e) => match e.into_inner() {},
        }
    }

    /// Peek at a cached value without computing anything.
    ///
    /// Does not count as a hit or a miss.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().get(key).map(|entry| entry.value().clone())
    }

    /// Whether a value for `key` has been computed.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().contains_key(key)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of lookups served by the entry for `key`, if it exists.
    pub fn access_count<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().get(key).map(CacheEntry::access_count)
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failed_computations: self.failed_computations.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    /// Hit path: read lock only.
    fn lookup(&self, key: &K) -> Option<V> {
        let entries = self.read();
        let entry = entries.get(key)?;
        entry.touch();
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(access_count = entry.access_count(), "Cache hit");
        Some(entry.value().clone())
    }

    // Entries are only inserted after a successful computation, so the map is
    // consistent even if a compute function panicked while the lock was held.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;

    #[test]
    fn test_cache_hit_returns_same_instance() {
        let cache: LazyCache<&str, Arc<String>> = LazyCache::new();

        let first = cache.get_or_init("model", |k| Arc::new(k.to_uppercase()));
        let second = cache.get_or_init("model", |_| Arc::new("other".to_string()));

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_failed_compute_is_counted_and_not_stored() {
        let cache: LazyCache<String, u32> = LazyCache::new();

        let err = cache
            .get_or_compute("a".to_string(), |_| Err::<u32, _>("backend down"))
            .unwrap_err();

        assert_eq!(err.key(), "a");
        assert_eq!(err.to_string(), "computing value for key \"a\" failed: backend down");
        assert!(!cache.contains_key("a"));
        assert_eq!(cache.stats().failed_computations, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_does_not_compute_or_count() {
        let cache: LazyCache<String, u32> = LazyCache::new();
        assert_eq!(cache.get("x"), None);

        cache.get_or_init("x".to_string(), |_| 7);
        assert_eq!(cache.get("x"), Some(7));

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_access_count_tracks_hits() {
        let cache: LazyCache<u8, u8> = LazyCache::new();
        for _ in 0..4 {
            cache.get_or_init(1, |k| k * 2);
        }
        assert_eq!(cache.access_count(&1), Some(4));
        assert_eq!(cache.access_count(&2), None);
    }

    #[test]
    fn test_panicking_compute_leaves_cache_usable() {
        let cache: LazyCache<u8, u8> = LazyCache::new();

        let result = catch_unwind(AssertUnwindSafe(|| {
            cache.get_or_init(1, |_| panic!("compute exploded"));
        }));
        assert!(result.is_err());
        assert!(!cache.contains_key(&1));

        assert_eq!(cache.get_or_init(1, |_| 9), 9);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_compute_once_across_threads() {
        let cache: LazyCache<&str, usize> = LazyCache::new();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let value = cache.get_or_init("shared", |_| {
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        calls.fetch_add(1, Ordering::SeqCst) + 1
                    });
                    assert_eq!(value, 1);
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 7);
    }

    #[test]
    fn test_from_config_starts_empty() {
        let cache: LazyCache<u32, u32> =
            LazyCache::from_config(&CacheConfig { initial_capacity: 128 });
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_compute_sees_key() {
        let cache: LazyCache<u32, u32> = LazyCache::new();
        let seen = Cell::new(0);
        let value = cache.get_or_init(21, |k| {
            seen.set(*k);
            k * 2
        });
        assert_eq!(value, 42);
        assert_eq!(seen.get(), 21);
    }
}
