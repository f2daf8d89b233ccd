//! Core data types for the lazy cache.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A resolved cache entry with metadata.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The cached value.
    value: V,
    /// Timestamp when the value was computed.
    created_at: Instant,
    /// Number of lookups served from this entry, including the one that created it.
    access_count: AtomicU64,
}

impl<V> CacheEntry<V> {
    /// Create a new entry with an access count of 1.
    pub fn new(value: V) -> Self {
        Self { value, created_at: Instant::now(), access_count: AtomicU64::new(1) }
    }

    /// The cached value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// When the value was computed.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Number of lookups served from this entry.
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Record a lookup. Only needs a shared reference so hits can stay on the read lock.
    pub fn touch(&self) {
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cache statistics for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that ran the compute function.
    pub misses: u64,
    /// Misses whose compute function failed (nothing was stored).
    pub failed_computations: u64,
    /// Number of entries currently cached.
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache, 0.0 when there were none.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}
