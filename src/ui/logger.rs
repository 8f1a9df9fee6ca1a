/// Diagnostics for the console driver: a compact `tracing` subscriber on
/// stderr, filtered by `PUSHBLOCK_LOG` (e.g. `debug`, `pushblock::sim=trace`).

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PUSHBLOCK_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Filter from the environment variable `var`, `warn` if unset or invalid.
pub fn filter_from_env(var: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install once; a second call leaves the first subscriber in place.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env(LOG_ENV))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
