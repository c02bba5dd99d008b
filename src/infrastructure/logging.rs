//! Logging setup.
//!
//! `RUST_LOG` overrides the default filter when set.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the terminal subscriber. `verbose` lowers the default to `debug`.
///
/// Returns an error if a global subscriber is already set.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "tracematrix=debug" } else { "tracematrix=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_names(true)
                .compact(),
        )
        .try_init()?;
    Ok(())
}

/// Logging for tests: captured by the test harness, safe to call repeatedly.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_test_writer()
                .compact(),
        )
        .try_init();
}
