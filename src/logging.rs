//! Logging initialization.
//!
//! Events go to stderr so command output on stdout (JSON listings, PNG
//! bytes) stays clean. `RUST_LOG`, when set, replaces the configured level.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;

/// Parse a log level name. `None` for anything unrecognized.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn build_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return EnvFilter::from_default_env();
    }
    let level = if verbose {
        Level::DEBUG
    } else {
        parse_level(&config.level).unwrap_or(Level::INFO)
    };
    EnvFilter::default().add_directive(level.into())
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(config: &LoggingConfig, verbose: bool) {
    let filter = build_filter(config, verbose);
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init();
}
