//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: compact formatter, `RUST_LOG` filter
/// falling back to `default_level`.
///
/// A no-op if a subscriber is already installed, so embedding applications
/// keep their own setup.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .try_init();
}
