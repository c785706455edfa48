//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize logging for the process. Output goes to stderr so csv and json
/// on stdout stay pipeable. `RUST_LOG` overrides the level.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(verbose: bool) {
    let default_level = if verbose { "stocktake=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
