//! Command-line interface parsing for the Pokedex REPL
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated `StartupConfig`.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::data::DEFAULT_BASE_URL;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The cache interval was zero
    #[error("Invalid cache interval: must be at least 1 second")]
    InvalidInterval,
}

/// Pokedex - explore PokeAPI locations and catch pokemon from your terminal
#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(about = "Interactive Pokedex over PokeAPI")]
#[command(version)]
pub struct Cli {
    /// How long API responses stay cached, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 5, env = "POKEDEX_CACHE_INTERVAL")]
    pub cache_interval: u64,

    /// Base URL of the PokeAPI instance to query
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL, env = "POKEDEX_BASE_URL")]
    pub base_url: String,

    /// Log level written to stderr (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupConfig {
    /// Expiry interval for the response cache
    pub cache_interval: Duration,
    /// PokeAPI base URL
    pub base_url: String,
    /// Log level directive for this crate
    pub log_level: String,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            cache_interval: Duration::from_secs(5),
            base_url: DEFAULT_BASE_URL.to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError::InvalidInterval)` if the cache interval is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.cache_interval == 0 {
            return Err(CliError::InvalidInterval);
        }
        Ok(StartupConfig {
            cache_interval: Duration::from_secs(cli.cache_interval),
            base_url: cli.base_url.clone(),
            log_level: cli.log_level.clone(),
        })
    }
}
