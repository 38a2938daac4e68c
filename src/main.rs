//! Pokedex - explore PokeAPI from the terminal
//!
//! A line-oriented REPL that pages through location areas, explores them,
//! and catches pokemon. API responses are held in an expiring cache.

use std::io::{self, Write};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use pokedex::app::{print_welcome, App};
use pokedex::cache::Cache;
use pokedex::cli::{Cli, StartupConfig};
use pokedex::data::PokeApiClient;
use pokedex::logging;

const PROMPT: &str = "Pokedex > ";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => Cli::command().error(ErrorKind::InvalidValue, err).exit(),
    };
    logging::init(&config.log_level);

    let cache = Cache::new(config.cache_interval)?;
    let client = PokeApiClient::with_base_url(cache, &config.base_url);
    let mut app = App::new(client);

    let mut stdout = io::stdout();
    print_welcome(&mut stdout)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "{}", PROMPT)?;
        stdout.flush()?;

        // End of input behaves like `exit` without the farewell
        let Some(line) = lines.next_line().await? else {
            writeln!(stdout)?;
            break;
        };

        if let Err(err) = app.handle_line(&line, &mut stdout).await {
            debug!(error = %err, "command failed");
            writeln!(stdout, "error: {}", err)?;
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown().await;
    Ok(())
}
