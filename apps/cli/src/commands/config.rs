//! Config command implementation.

use memopool_core::MemopoolConfig;

/// Print the effective configuration as TOML.
pub fn execute(config: &MemopoolConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
