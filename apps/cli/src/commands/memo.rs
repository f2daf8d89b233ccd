//! Memo command implementation.
//!
//! Looks keys up through a memoized slow function.

use colored::Colorize;
use memopool_core::compose::timed;
use memopool_core::{MemopoolConfig, Memoized};
use rand::Rng;
use std::convert::Infallible;
use std::time::{Duration, Instant};

const DEFAULT_KEYS: [&str; 4] = ["a", "b", "a", "b"];

/// Execute the memo command.
///
/// Each distinct key costs `delay_ms` the first time it is requested; every
/// later request for it returns the stored value without waiting.
pub fn execute(
    config: &MemopoolConfig,
    keys: Vec<String>,
    delay_ms: u64,
    json: bool,
) -> anyhow::Result<()> {
    let keys = if keys.is_empty() {
        DEFAULT_KEYS.iter().map(|k| (*k).to_string()).collect()
    } else {
        keys
    };

    let delay = Duration::from_millis(delay_ms);
    let grab_data = Memoized::with_config(
        |key: &String| {
            tracing::debug!(key = %key, delay_ms, "Fetching data");
            std::thread::sleep(delay);
            Ok::<_, Infallible>(rand::thread_rng().gen_range(0..=100_u32))
        },
        &config.cache,
    );

    println!("{}", "Looking up keys (first requests for a key take a while)".bold().cyan());
    println!();

    let start = Instant::now();
    for key in keys {
        let (value, elapsed) = timed(|| grab_data.call(key.clone()));
        let value = value?;
        println!("{}: {}  {}", key, value, format!("({:.5} seconds)", elapsed.as_secs_f64()).dimmed());
    }

    let stats = grab_data.stats();
    println!();
    println!(
        "{}",
        format!(
            "✓ {} lookups, {} computed, {:.5} seconds total",
            stats.hits + stats.misses,
            stats.misses,
            start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}
