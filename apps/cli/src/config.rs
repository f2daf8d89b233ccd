//! CLI configuration loading.

use memopool_core::MemopoolConfig;
use std::path::Path;

/// Load the configuration used by every command.
///
/// Configuration precedence:
/// 1. `--config <path>`
/// 2. The file named by `MEMOPOOL_CONFIG`
/// 3. Local config file (./memopool.toml)
/// 4. Defaults
///
/// An explicit `--config` path must exist; the discovered locations fall back
/// to defaults when absent.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<MemopoolConfig> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            MemopoolConfig::load(path)?
        }
        None => MemopoolConfig::discover()?,
    };
    tracing::debug!(
        pool_size = config.dispatch.pool_size,
        failure_policy = %config.dispatch.failure_policy,
        initial_capacity = config.cache.initial_capacity,
        "Configuration loaded"
    );
    Ok(config)
}
