//! Tracing setup for the detection server.

use tracing_subscriber::filter::EnvFilter;

/// Install the global fmt subscriber.
///
/// Respects `RUST_LOG` when set; otherwise defaults to `info`, or `debug`
/// with `--verbose`. Safe to call more than once (later calls are no-ops),
/// which keeps tests that touch logging from panicking.
pub(crate) fn init(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .try_init();
}
