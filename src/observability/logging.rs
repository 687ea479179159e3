//! # Logging
//!
//! `tracing` subscriber setup. The filter comes from `RUST_LOG` and defaults to info level
//! for this crate.

use crate::constants::DEFAULT_LOG_FILTER;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// Returns `false` when a subscriber was already installed (tests, embedding binaries).
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .try_init()
        .is_ok()
}
