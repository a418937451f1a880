//! Structured logging setup (§1): an `EnvFilter` seeded from the configured
//! log level (overridable via `RUST_LOG`), emitting to stdout in a
//! human-readable format.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber. Call once at process
/// startup; a second call is a programming error and will panic, matching
/// `tracing_subscriber`'s own global-subscriber contract.
pub fn init_telemetry(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
