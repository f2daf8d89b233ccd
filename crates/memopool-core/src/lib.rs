//! memopool core - lazy memoization and bounded-concurrency dispatch.
//!
//! This crate provides two independent primitives plus the small helpers they
//! are built from:
//! - [`LazyCache`]: computes a value at most once per key and serves every
//!   later lookup from memory
//! - [`BoundedDispatcher`]: runs a work function over a batch of inputs with
//!   at most N invocations in flight, returning results in input order
//! - [`compose`] and [`scope`]: higher-order wrapping and scope guards
//! - [`config`]: TOML configuration for both primitives
//!
//! # Example
//!
//! ```rust,no_run
//! use memopool_core::{BoundedDispatcher, LazyCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache: LazyCache<String, usize> = LazyCache::new();
//!     let len = cache.get_or_init("hello".to_string(), |key| key.len());
//!     assert_eq!(len, 5);
//!
//!     let dispatcher = BoundedDispatcher::new(2)?;
//!     let tens = dispatcher
//!         .run_all(vec![3, 1, 2], |x: u32| async move { Ok::<_, String>(x * 10) })
//!         .await?;
//!     assert_eq!(tens, vec![30, 10, 20]);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod scope;

pub use cache::{CacheError, CacheStats, LazyCache, Memoized, memoize};
pub use config::{CacheConfig, ConfigError, DispatchConfig, MemopoolConfig};
pub use dispatch::{
    BoundedDispatcher, DispatchError, DispatchProgress, DispatchReport, FailurePolicy,
    TaskError, TaskFailure,
};
