//! Data types for batch dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::TaskFailure;

/// What the dispatcher does when a task fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop claiming new inputs after the first failure and report it.
    /// Tasks already running are allowed to finish.
    #[default]
    FailFast,
    /// Run every input, then report all failures together.
    CollectAll,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail-fast"),
            Self::CollectAll => write!(f, "collect-all"),
        }
    }
}

/// Snapshot of batch progress, taken right after a task finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchProgress {
    /// Index of the task that just finished.
    pub index: usize,
    /// Tasks finished so far (successful or not).
    pub completed: usize,
    /// Tasks currently holding a worker slot.
    pub active: usize,
    /// Tasks that produced an output.
    pub succeeded: usize,
    /// Tasks that failed.
    pub failed: usize,
    /// Number of inputs in the batch.
    pub total: usize,
}

/// Progress callback invoked after every finished task.
pub type ProgressCallback = Arc<dyn Fn(DispatchProgress) + Send + Sync>;

/// Outcome of a collect-all run.
#[derive(Debug)]
pub struct DispatchReport<I, O, E> {
    /// One result per input, in input order.
    pub results: Vec<Result<O, TaskFailure<I, E>>>,
    /// Wall-clock duration of the whole batch.
    pub total_duration: Duration,
    /// Highest number of tasks observed running at once.
    pub peak_active: usize,
}

impl<I, O, E> DispatchReport<I, O, E> {
    /// Number of inputs in the batch.
    pub fn total_items(&self) -> usize {
        self.results.len()
    }

    /// Number of inputs that produced an output.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Failed tasks, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &TaskFailure<I, E>> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    /// Whether every input produced an output.
    pub fn is_complete_success(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }

    /// Success rate as a percentage (0.0 to 100.0). An empty batch reports 0.0.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_items();
        if total == 0 {
            return 0.0;
        }
        (self.succeeded() as f64 / total as f64) * 100.0
    }

    /// Consume the report, returning the per-input results.
    pub fn into_results(self) -> Vec<Result<O, TaskFailure<I, E>>> {
        self.results
    }
}
