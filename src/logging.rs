//! Logging init for widget hosts.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install a stderr `tracing` subscriber.
///
/// The filter comes from `NEIGHBORLY_LOG`, falling back to `RUST_LOG`, then
/// to `info`. Hosts that install their own subscriber should skip this.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_env("NEIGHBORLY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}
