//! Bounded dispatcher for parallel execution of a work function.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::error::{DispatchError, TaskError, TaskFailure};
use super::types::{DispatchProgress, DispatchReport, FailurePolicy, ProgressCallback};
use crate::config::{ConfigError, DispatchConfig};
use crate::scope::defer;

/// Runs a work function over a batch of inputs with bounded concurrency.
///
/// Each batch gets its own set of `pool_size` worker slots. An input is
/// claimed by acquiring a slot, in input order, and the slot is held until its
/// task has finished, so no more than `pool_size` invocations of the work
/// function are ever in flight. Outputs are returned in input order whatever
/// the completion order.
///
/// Dropping the future returned by a `run_*` method stops new inputs from
/// being claimed; tasks already running are detached and run to completion.
#[derive(Clone)]
pub struct BoundedDispatcher {
    /// Maximum number of concurrent invocations per batch.
    pool_size: usize,
    /// Failure policy used by `run_all`.
    policy: FailurePolicy,
    /// Optional progress callback.
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for BoundedDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedDispatcher")
            .field("pool_size", &self.pool_size)
            .field("policy", &self.policy)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

/// Counters shared by the tasks of one batch.
#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    peak_active: AtomicUsize,
    completed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn snapshot(&self, index: usize, completed: usize, total: usize) -> DispatchProgress {
        DispatchProgress {
            index,
            completed,
            active: self.active.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            total,
        }
    }
}

/// What happened to one input.
enum Outcome<O, E> {
    /// The task ran to a terminal state.
    Done(Result<O, TaskError<E>>),
    /// The input was never claimed because fail-fast tripped first.
    Skipped,
}

/// Raw result of one batch, before a failure policy is applied.
struct Batch<I, O, E> {
    inputs: Vec<I>,
    outcomes: Vec<Outcome<O, E>>,
    first_failure: Option<usize>,
    total_duration: Duration,
    peak_active: usize,
}

impl<I, O, E> Batch<I, O, E> {
    fn into_result(self, policy: FailurePolicy) -> Result<Vec<O>, DispatchError<I, E>> {
        let total = self.inputs.len();
        let mut outputs = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (index, (input, outcome)) in self.inputs.into_iter().zip(self.outcomes).enumerate() {
            match outcome {
                Outcome::Done(Ok(output)) => outputs.push(output),
                Outcome::Done(Err(error)) => failures.push(TaskFailure { index, input, error }),
                Outcome::Skipped => {}
            }
        }

        if failures.is_empty() {
            return Ok(outputs);
        }

        match policy {
            FailurePolicy::FailFast => {
                let position = self
                    .first_failure
                    .and_then(|first| failures.iter().position(|f| f.index == first))
                    .unwrap_or(0);
                Err(DispatchError::TaskFailed(failures.swap_remove(position)))
            }
            FailurePolicy::CollectAll => Err(DispatchError::TasksFailed { failures, total }),
        }
    }

    fn into_report(self) -> DispatchReport<I, O, E> {
        let results = self
            .inputs
            .into_iter()
            .zip(self.outcomes)
            .enumerate()
            .map(|(index, (input, outcome))| match outcome {
                Outcome::Done(Ok(output)) => Ok(output),
                Outcome::Done(Err(error)) => Err(TaskFailure { index, input, error }),
                Outcome::Skipped => Err(TaskFailure { index, input, error: TaskError::Cancelled }),
            })
            .collect();

        DispatchReport { results, total_duration: self.total_duration, peak_active: self.peak_active }
    }
}

impl BoundedDispatcher {
    /// Create a dispatcher with `pool_size` worker slots and the fail-fast policy.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidPoolSize` if `pool_size` is zero.
    pub fn new(pool_size: usize) -> Result<Self, ConfigError> {
        if pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize);
        }
        Ok(Self { pool_size, policy: FailurePolicy::default(), progress: None })
    }

    /// Create a dispatcher from configuration.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.pool_size)?.with_policy(config.failure_policy))
    }

    /// Set the failure policy used by [`run_all`](Self::run_all).
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a callback invoked after every finished task.
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(DispatchProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Maximum number of concurrent invocations.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Failure policy used by `run_all`.
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run `work` over every input and return the outputs in input order.
    ///
    /// # Errors
    /// With [`FailurePolicy::FailFast`], returns the first failure as
    /// `DispatchError::TaskFailed`; inputs not yet claimed never start.
    /// With [`FailurePolicy::CollectAll`], every input runs and all failures
    /// are returned as `DispatchError::TasksFailed`.
    pub async fn run_all<I, O, E, F, Fut>(
        &self,
        inputs: Vec<I>,
        work: F,
    ) -> Result<Vec<O>, DispatchError<I, E>>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
    {
        self.dispatch(inputs, work, self.policy).await.into_result(self.policy)
    }

    /// Run `work` over every input regardless of failures and report each
    /// input's own result.
    ///
    /// The configured failure policy is ignored; this is always collect-all.
    pub async fn run_settled<I, O, E, F, Fut>(
        &self,
        inputs: Vec<I>,
        work: F,
    ) -> DispatchReport<I, O, E>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
    {
        self.dispatch(inputs, work, FailurePolicy::CollectAll).await.into_report()
    }

    /// [`run_all`](Self::run_all) for a synchronous work function.
    ///
    /// Each invocation runs on the blocking thread pool while it holds a slot.
    pub async fn run_all_blocking<I, O, E, F>(
        &self,
        inputs: Vec<I>,
        work: F,
    ) -> Result<Vec<O>, DispatchError<I, E>>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        self.run_all(inputs, move |input| {
            let work = Arc::clone(&work);
            async move {
                match tokio::task::spawn_blocking(move || work(input)).await {
                    Ok(result) => result,
                    // Re-raise so the panic is reported like any other task panic.
                    Err(e) => std::panic::resume_unwind(
                        e.try_into_panic()
                            .unwrap_or_else(|e| Box::new(e.to_string()) as Box<dyn Any + Send>),
                    ),
                }
            }
        })
        .await
    }

    async fn dispatch<I, O, E, F, Fut>(
        &self,
        inputs: Vec<I>,
        work: F,
        policy: FailurePolicy,
    ) -> Batch<I, O, E>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
    {
        let start_time = Instant::now();
        let total = inputs.len();

        if total == 0 {
            return Batch {
                inputs,
                outcomes: Vec::new(),
                first_failure: None,
                total_duration: start_time.elapsed(),
                peak_active: 0,
            };
        }

        debug!(
            total_items = total,
            pool_size = self.pool_size,
            policy = %policy,
            "Starting batch dispatch"
        );

        let work = Arc::new(work);
        // A batch never needs more slots than inputs.
        let slots = Arc::new(Semaphore::new(
            self.pool_size.min(total).min(Semaphore::MAX_PERMITS),
        ));
        let counters = Arc::new(Counters::default());
        let first_failure = Arc::new(OnceLock::new());

        let mut handles = Vec::with_capacity(total);

        for (index, input) in inputs.iter().cloned().enumerate() {
            // Closed slots mean fail-fast has tripped.
            let Ok(slot) = Arc::clone(&slots).acquire_owned().await else {
                debug!(index, remaining = total - index, "Slots closed, skipping remaining inputs");
                break;
            };

            let work = Arc::clone(&work);
            let slots = Arc::clone(&slots);
            let counters = Arc::clone(&counters);
            let first_failure = Arc::clone(&first_failure);
            let progress = self.progress.clone();

            handles.push(tokio::spawn(async move {
                let _slot = slot;

                let result = {
                    counters.enter();
                    let _leave = defer(|| counters.leave());
                    AssertUnwindSafe(async { work(input).await }).catch_unwind().await
                };

                let result = match result {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(e)) => Err(TaskError::Failed(e)),
                    Err(payload) => Err(TaskError::Panicked(panic_message(&*payload))),
                };

                if result.is_ok() {
                    counters.succeeded.fetch_add(1, Ordering::SeqCst);
                } else {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    warn!(index, "Task failed");
                    if policy == FailurePolicy::FailFast && first_failure.set(index).is_ok() {
                        slots.close();
                        info!(index, "Fail-fast: no further inputs will be claimed");
                    }
                }

                let completed = counters.completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(callback) = &progress {
                    let snapshot = counters.snapshot(index, completed, total);
                    if std::panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot))).is_err() {
                        warn!(index, "Progress callback panicked");
                    }
                }

                Outcome::Done(result)
            }));
        }

        let mut outcomes = Vec::with_capacity(total);
        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => {
                    Outcome::Done(Err(TaskError::Panicked(panic_message(&*e.into_panic()))))
                }
                Err(e) => {
                    error!("Task join error: {}", e);
                    Outcome::Done(Err(TaskError::Cancelled))
                }
            };
            outcomes.push(outcome);
        }
        let skipped = total - outcomes.len();
        outcomes.resize_with(total, || Outcome::Skipped);

        let total_duration = start_time.elapsed();
        let peak_active = counters.peak_active.load(Ordering::SeqCst);

        debug!(
            total_items = total,
            succeeded = counters.succeeded.load(Ordering::SeqCst),
            failed = counters.failed.load(Ordering::SeqCst),
            skipped,
            peak_active,
            duration_ms = total_duration.as_millis() as u64,
            "Batch dispatch completed"
        );

        Batch {
            inputs,
            outcomes,
            first_failure: first_failure.get().copied(),
            total_duration,
            peak_active,
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
