//! Tracing subscriber setup.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global subscriber. `RUST_LOG` overrides `filter` when set.
/// Later calls are no-ops.
pub fn init(filter: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// Subscriber for tests: output captured by the test harness.
pub fn init_for_tests() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apz_dnd=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
