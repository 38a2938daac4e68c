//! Tracing setup
//!
//! Logs go to stderr so that stdout carries only the REPL conversation.

use std::io;

use tracing_subscriber::EnvFilter;

/// Builds the log filter: `RUST_LOG` wins, otherwise `pokedex=<level>`
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("pokedex={}", level)))
}

/// Installs the global tracing subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
