//! A function bundled with its own memo table.

use std::hash::Hash;

use super::error::CacheError;
use super::lazy::LazyCache;
use super::types::CacheStats;
use crate::config::CacheConfig;

/// A function wrapped with an instance-owned [`LazyCache`].
///
/// Every `Memoized` value owns its cache; two wrappers around the same
/// function never share results.
///
/// ```
/// use memopool_core::memoize;
///
/// let square = memoize(|n: &u64| Ok::<_, String>(n * n));
/// assert_eq!(square.call(12), Ok(144));
/// assert_eq!(square.stats().misses, 1);
/// assert_eq!(square.call(12), Ok(144));
/// assert_eq!(square.stats().hits, 1);
/// ```
#[derive(Debug)]
pub struct Memoized<K, V, F> {
    cache: LazyCache<K, V>,
    f: F,
}

/// Wrap `f` so each distinct key is computed once.
pub fn memoize<K, V, E, F>(f: F) -> Memoized<K, V, F>
where
    K: Eq + Hash,
    V: Clone,
    F: Fn(&K) -> Result<V, E>,
{
    Memoized { cache: LazyCache::new(), f }
}

impl<K, V, F> Memoized<K, V, F>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Wrap `f` with a cache sized from configuration.
    pub fn with_config<E>(f: F, config: &CacheConfig) -> Self
    where
        F: Fn(&K) -> Result<V, E>,
    {
        Self { cache: LazyCache::from_config(config), f }
    }

    /// Call the wrapped function, or return the value cached for `key`.
    ///
    /// # Errors
    /// Returns `CacheError::ComputeFailed` if the wrapped function fails.
    pub fn call<E>(&self, key: K) -> Result<V, CacheError<K, E>>
    where
        F: Fn(&K) -> Result<V, E>,
    {
        self.cache.get_or_compute(key, &self.f)
    }

    /// The underlying cache.
    pub fn cache(&self) -> &LazyCache<K, V> {
        &self.cache
    }

    /// Statistics of the underlying cache.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
