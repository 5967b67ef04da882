//! `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber for the process.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (e.g. `"info"` or
/// `"info,dealgate_session=debug"`) is used. Returns `false` if a global
/// subscriber was already installed, which is fine: the first one stays.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
