//! Helpers related to tracing, used by main entrypoints

use tracing_subscriber::EnvFilter;

/// The environment variable consulted for log filter directives, before `RUST_LOG`.
pub const LOG_ENV: &str = "PODCONFIG_LOG";

/// Compute the filter from the environment, preferring [`LOG_ENV`] over `RUST_LOG`
/// and defaulting to warnings only.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize tracing with the default configuration.
pub fn initialize_tracing() {
    // No timestamps, whatever collects stderr adds its own
    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_target(false)
        .compact();
    // Stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .event_format(format)
        .with_writer(std::io::stderr)
        .init();
}
