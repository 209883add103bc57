//! Logging setup.
//!
//! The library only emits `tracing` events; applications and tests call
//! [`init_logging`] to print them.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "LARDER_LOG";

/// Install a formatting subscriber filtered by `LARDER_LOG`, or by
/// `default_directive` (e.g. `"larder=debug"`) when it is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
