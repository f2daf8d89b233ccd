//! Error types for batch dispatch.

use thiserror::Error;

/// Why a single task did not produce an output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError<E> {
    /// The work function returned an error.
    #[error("{0}")]
    Failed(E),

    /// The work function panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was torn down by the runtime before it finished.
    #[error("task was cancelled before it finished")]
    Cancelled,
}

impl<E> TaskError<E> {
    /// The work function's own error, if that is what happened.
    pub fn as_failed(&self) -> Option<&E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// A failed task together with the input that produced it.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("task {index} failed for input {input:?}: {error}")]
pub struct TaskFailure<I, E> {
    /// Position of the input in the batch.
    pub index: usize,
    /// The input the work function was called with.
    pub input: I,
    /// What went wrong.
    pub error: TaskError<E>,
}

/// Errors returned by [`BoundedDispatcher::run_all`](super::BoundedDispatcher::run_all).
#[derive(Debug, Error)]
pub enum DispatchError<I, E> {
    /// Fail-fast: the first task to fail. Inputs not yet started were skipped.
    #[error("{0}")]
    TaskFailed(TaskFailure<I, E>),

    /// Collect-all: every failed task, in input order.
    #[error("{} of {total} tasks failed", .failures.len())]
    TasksFailed {
        /// Failures in input order.
        failures: Vec<TaskFailure<I, E>>,
        /// Number of inputs in the batch.
        total: usize,
    },
}

impl<I, E> DispatchError<I, E> {
    /// All failures carried by this error, in input order.
    pub fn failures(&self) -> &[TaskFailure<I, E>] {
        match self {
            Self::TaskFailed(failure) => std::slice::from_ref(failure),
            Self::TasksFailed { failures, .. } => failures,
        }
    }

    /// Consume the error, returning its failures.
    pub fn into_failures(self) -> Vec<TaskFailure<I, E>> {
        match self {
            Self::TaskFailed(failure) => vec![failure],
            Self::TasksFailed { failures, .. } => failures,
        }
    }
}
