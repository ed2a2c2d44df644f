//! Tracing setup shared by the binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber: compact, ANSI terminal output.
///
/// `verbose` lowers the default filter to `debug`; `RUST_LOG` overrides
/// the default when set. Safe to call more than once (later calls are
/// no-ops), so binaries and tests can share it.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .compact(),
        )
        .try_init();
}
