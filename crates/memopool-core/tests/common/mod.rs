//! Shared helpers for memopool-core integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Installs a test-writer tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records how many work invocations are in flight and the highest value seen.
#[derive(Debug, Default)]
pub struct ActivityProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl ActivityProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Marks an invocation as running for `hold`, then finished.
    pub async fn hold(&self, hold: Duration) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(hold).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}
