#![forbid(unsafe_code)]

//! JSON logging setup for hosts that do not install their own subscriber.
//!
//! The filter is read from `FTUI_NAV_LOG`, then `RUST_LOG`, and defaults to
//! `warn` so precondition failures stay visible.

use tracing_subscriber::EnvFilter;

/// Environment variable consulted first for the log filter.
pub const LOG_ENV: &str = "FTUI_NAV_LOG";

/// Build the filter from the environment.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install a global JSON subscriber writing to stderr.
///
/// Fails if a global subscriber is already set.
pub fn init_json() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
}
