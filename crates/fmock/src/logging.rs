//! Test logging setup.
//!
//! Every engine event (`fmock::record_call`, `fmock::verify`,
//! `fmock::out_of_order`, ...) is a `tracing` event. Test binaries call
//! [`init_test_logging`] once to see them, filtered through `RUST_LOG`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Install a compact subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    init_test_logging_with(DEFAULT_FILTER);
}

/// Like [`init_test_logging`], with an explicit fallback filter such as
/// `"fmock_core=debug"`.
pub fn init_test_logging_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_test_writer()
                .compact(),
        )
        .try_init();
}
