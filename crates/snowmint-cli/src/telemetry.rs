use tracing_subscriber::{EnvFilter, fmt};

/// Initializes structured logging using `tracing-subscriber`.
///
/// Logs go to stderr so stdout carries nothing but IDs. The level comes from
/// `RUST_LOG` and defaults to `info`; `RUST_LOG=snowmint=trace` shows every
/// generator call.
pub fn init_tracing() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .init();
}
