//! Tracing subscriber setup for the binary.
//!
//! Library code only emits events through `tracing` macros; this module
//! installs the subscriber. Output goes to stderr so JSON on stdout stays
//! machine-readable.

use std::io::{self, IsTerminal};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Filter used when neither `RUST_LOG` nor a valid configured level applies.
const FALLBACK_FILTER: &str = "info";

/// Resolves the active filter: `RUST_LOG` first, then `debug`, then the
/// configured level.
pub fn build_filter(config: &LoggingConfig, debug: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = if debug { "debug" } else { config.level.as_str() };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Installs the global subscriber. Calling it twice is a no-op.
pub fn init(config: &LoggingConfig, debug: bool) {
    let filter = build_filter(config, debug);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_ansi(io::stderr().is_terminal()),
        )
        .try_init();
}
