//! Pool command implementation.
//!
//! Times a batch of random waits run one after another and through the
//! bounded dispatcher.

use clap::ValueEnum;
use colored::Colorize;
use memopool_core::compose::timed_async;
use memopool_core::{BoundedDispatcher, MemopoolConfig};
use rand::Rng;
use std::convert::Infallible;
use std::time::Duration;

/// Which runs the pool command times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PoolMode {
    /// One input at a time
    Sequential,
    /// Through the bounded dispatcher
    Pooled,
    /// Sequential first, then pooled
    Both,
}

/// Execute the pool command.
pub async fn execute(
    config: &MemopoolConfig,
    count: usize,
    pool_size: Option<usize>,
    max_wait_ms: u64,
    mode: PoolMode,
) -> anyhow::Result<()> {
    let mut dispatch_config = config.dispatch.clone();
    if let Some(size) = pool_size {
        dispatch_config.pool_size = size;
    }
    let dispatcher = BoundedDispatcher::from_config(&dispatch_config)?.with_progress(|p| {
        tracing::info!(
            index = p.index,
            completed = p.completed,
            active = p.active,
            total = p.total,
            "Wait finished"
        );
    });

    let inputs: Vec<usize> = (0..count).collect();

    if matches!(mode, PoolMode::Sequential | PoolMode::Both) {
        println!("{}", format!("Running {} waits sequentially", count).bold().cyan());
        let ((), elapsed) = timed_async(async {
            for &value in &inputs {
                random_wait(value, max_wait_ms).await;
            }
        })
        .await;
        println!("{:.5} seconds", elapsed.as_secs_f64());
    }

    if matches!(mode, PoolMode::Pooled | PoolMode::Both) {
        if mode == PoolMode::Both {
            println!();
        }
        println!(
            "{}",
            format!("Running {} waits, {} at a time", count, dispatcher.pool_size()).bold().cyan()
        );
        let (result, elapsed) = timed_async(dispatcher.run_all(inputs, move |value| async move {
            random_wait(value, max_wait_ms).await;
            Ok::<_, Infallible>(value)
        }))
        .await;
        let finished = result?;
        println!("{:.5} seconds", elapsed.as_secs_f64());
        tracing::debug!(finished = finished.len(), "Pooled run complete");
    }

    Ok(())
}

/// Wait between a fifth of `max_wait_ms` and all of it, then print `value`.
async fn random_wait(value: usize, max_wait_ms: u64) {
    let fifths = rand::thread_rng().gen_range(1..=5_u32);
    tokio::time::sleep(wait_duration(max_wait_ms, fifths)).await;
    println!("{}", value);
}

/// `fifths` fifths of `max_wait_ms`, computed without integer overflow.
fn wait_duration(max_wait_ms: u64, fifths: u32) -> Duration {
    Duration::from_millis(max_wait_ms) * fifths / 5
}
