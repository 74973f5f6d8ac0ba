//! Logging infrastructure
//!
//! The library logs through `tracing` and never installs a subscriber on
//! its own. Hosts that already run one see the pipeline's output
//! directly; hosts without one can call [`init`] for a sensible console
//! subscriber.

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Initialize a console subscriber for hosts without their own.
///
/// The filter defaults to `level` and can be overridden via `RUST_LOG`.
/// Calling this when a subscriber is already installed is a no-op.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Initialize logging for tests (logs to the test writer).
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
