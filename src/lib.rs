//! Pokedex CLI Library
//!
//! This module exposes the cache, client and REPL modules for use in integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod logging;
pub mod pokedex;
