//! Logging setup.
//!
//! The library only emits `tracing` events; binaries and tests that want to
//! see them call [`init_logging`] once.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::EngineConfig;

/// Install a global fmt subscriber. `RUST_LOG` overrides the configured
/// filter. Returns `false` if a subscriber was already installed.
pub fn init_logging(config: &EngineConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
