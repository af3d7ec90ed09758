//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `smartbin=debug`.
const LOG_ENV: &str = "SMARTBIN_LOG";

/// Install a stderr subscriber.
///
/// `SMARTBIN_LOG` wins over `RUST_LOG`; with neither set, `default_level`
/// applies. Stdout stays reserved for command output.
pub(crate) fn init(default_level: &str) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
