//! Structured logging setup for the binary.
//!
//! Logs go to stderr so the verification report on stdout stays clean.
//! Verbosity follows `RUST_LOG`, defaulting to `info`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(anyhow::Error::msg)
}
