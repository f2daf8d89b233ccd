//! Bounded-concurrency dispatch of a work function over a batch of inputs.

pub mod dispatcher;
pub mod error;
pub mod types;

pub use dispatcher::BoundedDispatcher;
pub use error::{DispatchError, TaskError, TaskFailure};
pub use types::{DispatchProgress, DispatchReport, FailurePolicy, ProgressCallback};
