//! memopool CLI - demos for the lazy cache and the bounded dispatcher.
//!
//! Each subcommand exercises one part of `memopool-core` and prints what it
//! observes, so the effect of memoization, bounded concurrency and scoped
//! wrapping can be seen from a terminal.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{guard, memo, pool, wrap};

/// memopool CLI - lazy memoization and bounded-concurrency dispatch
#[derive(Parser, Debug)]
#[command(
    name = "memopool-cli",
    author,
    version,
    about = "memopool - lazy memoization and bounded-concurrency dispatch"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Configuration file (overrides MEMOPOOL_CONFIG and ./memopool.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up keys through a memoizing cache
    ///
    /// The first lookup of each key is slow; repeated lookups return the
    /// stored value immediately.
    Memo {
        /// Keys to look up, in order (defaults to a b a b)
        keys: Vec<String>,

        /// How long computing a value takes, in milliseconds
        #[arg(long, default_value_t = 2000)]
        delay_ms: u64,

        /// Print cache statistics as JSON when done
        #[arg(long)]
        json: bool,
    },

    /// Run random waits sequentially and through the bounded dispatcher
    Pool {
        /// Number of inputs
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Concurrent slots (overrides the configured pool size)
        #[arg(long)]
        pool_size: Option<usize>,

        /// Longest single wait, in milliseconds (at most one hour)
        #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(..=3_600_000))]
        max_wait_ms: u64,

        /// Which runs to time
        #[arg(long, value_enum, default_value_t = pool::PoolMode::Both)]
        mode: pool::PoolMode,
    },

    /// Call a function wrapped with an in/out hook
    Wrap {
        /// Repetition count passed to each call
        #[arg(long, default_values_t = [1, 3])]
        times: Vec<usize>,
    },

    /// Show a scope guard's enter and exit actions
    Guard,

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Memo { keys, delay_ms, json } => {
            memo::execute(&config, keys, delay_ms, json)?;
        }
        Command::Pool { count, pool_size, max_wait_ms, mode } => {
            pool::execute(&config, count, pool_size, max_wait_ms, mode).await?;
        }
        Command::Wrap { times } => {
            wrap::execute(&times);
        }
        Command::Guard => {
            guard::execute();
        }
        Command::Config => {
            commands::config::execute(&config)?;
        }
    }

    Ok(())
}
