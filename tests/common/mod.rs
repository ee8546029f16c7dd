//! Shared setup for integration tests

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a test subscriber once. Honors `RUST_LOG`, defaults to `warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}
