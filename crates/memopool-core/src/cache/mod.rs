//! Lazy memoizing cache.
//!
//! Values are computed on first request and kept for the lifetime of the
//! cache, so repeat lookups skip the computation entirely.

pub mod error;
pub mod lazy;
pub mod memoized;
pub mod types;

pub use error::CacheError;
pub use lazy::LazyCache;
pub use memoized::{Memoized, memoize};
pub use types::{CacheEntry, CacheStats};
