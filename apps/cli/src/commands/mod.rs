//! Command implementations for the memopool CLI.

pub mod config;
pub mod guard;
pub mod memo;
pub mod pool;
pub mod wrap;
