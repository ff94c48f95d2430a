//! Tracing setup for tests
//!
//! Installs a fmt subscriber writing through the test capture, filtered
//! by `RUST_LOG`. Safe to call from every test; only the first call
//! installs anything.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the test tracing subscriber once per process.
pub fn init_test_logging() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}
