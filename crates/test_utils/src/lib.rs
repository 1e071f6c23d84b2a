#![deny(missing_docs)]
//! Shared helpers for pht workspace tests.

/// Route tracing output to the test harness, honoring `RUST_LOG`.
///
/// Falls back to debug level when `RUST_LOG` is unset. Safe to call from
/// every test; only the first call installs a subscriber, the rest are
/// no-ops.
pub fn enable_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
