//! Test helpers.

use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Route `tracing` output to the test harness. Only the first call has an
/// effect; set `RUST_LOG` to see engine events.
pub(crate) fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}
