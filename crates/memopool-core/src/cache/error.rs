//! Error types for the lazy cache.

use thiserror::Error;

/// Errors returned by [`LazyCache::get_or_compute`](super::LazyCache::get_or_compute).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError<K, E> {
    /// The compute function failed. Nothing was stored for `key`.
    #[error("computing value for key {key:?} failed: {error}")]
    ComputeFailed {
        /// The key whose value could not be computed.
        key: K,
        /// Error returned by the compute function.
        error: E,
    },
}

impl<K, E> CacheError<K, E> {
    /// The key whose computation failed.
    pub fn key(&self) -> &K {
        match self {
            Self::ComputeFailed { key, .. } => key,
        }
    }

    /// Consume the error, returning the compute function's own error.
    pub fn into_inner(self) -> E {
        match self {
            Self::ComputeFailed { error, .. } => error,
        }
    }
}
