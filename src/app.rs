//! REPL state and command handling for the Pokedex
//!
//! This module cleans raw input lines, parses them into commands, and runs
//! each command against the application state. Handlers write to any
//! `std::io::Write` so the REPL can be driven from tests.

use std::io::{self, Write};

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info};

use crate::data::{ApiError, LocationAreaPage, PokeApiClient};
use crate::pokedex::{attempt_catch, CaughtPokemon, Pokedex};

/// Command names and their help text, in display order
pub const COMMANDS: &[(&str, &str)] = &[
    ("help", "Displays a help message"),
    ("exit", "Exit the Pokedex"),
    ("map", "Display the next 20 location areas"),
    ("mapb", "Display the previous 20 location areas"),
    ("explore <area>", "List the pokemon found in a location area"),
    ("catch <pokemon>", "Throw a Pokeball at a pokemon"),
    ("inspect <pokemon>", "Show details of a caught pokemon"),
    ("pokedex", "List all caught pokemon"),
];

/// Errors that can occur while running a command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The first word is not a known command
    #[error("Unknown command: '{0}'. Type 'help' for a list of commands")]
    UnknownCommand(String),

    /// The command needs an argument that was not given
    #[error("{command} requires {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    /// Fetching from PokeAPI failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Writing output failed
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// A parsed REPL command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    Map,
    MapBack,
    Explore(String),
    Catch(String),
    Inspect(String),
    Pokedex,
}

impl Command {
    /// Parses cleaned input words into a command
    ///
    /// # Returns
    /// * `Ok(None)` for empty input
    /// * `Ok(Some(Command))` for a recognised command
    /// * `Err(CommandError)` for unknown commands or missing arguments
    pub fn parse(words: &[String]) -> Result<Option<Self>, CommandError> {
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };
        let arg = |command: &'static str, argument: &'static str| {
            args.first()
                .cloned()
                .ok_or(CommandError::MissingArgument { command, argument })
        };

        let command = match name.as_str() {
            "help" => Command::Help,
            "exit" => Command::Exit,
            "map" => Command::Map,
            "mapb" => Command::MapBack,
            "explore" => Command::Explore(arg("explore", "a location area name")?),
            "catch" => Command::Catch(arg("catch", "a pokemon name")?),
            "inspect" => Command::Inspect(arg("inspect", "a pokemon name")?),
            "pokedex" => Command::Pokedex,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Splits a raw input line into lowercase words
///
/// Characters other than ASCII letters, digits, whitespace and `-` are dropped.
pub fn clean_input(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Prints the greeting and command list
pub fn print_welcome<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Welcome to the Pokedex!")?;
    writeln!(out, "Usage:")?;
    writeln!(out)?;
    for (name, description) in COMMANDS {
        writeln!(out, "{}: {}", name, description)?;
    }
    Ok(())
}

/// Position in the location-area listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    /// URL fetched by `map`, absent after the last page
    pub next: Option<String>,
    /// URL fetched by `mapb`, absent on the first page
    pub previous: Option<String>,
}

impl Pagination {
    fn follow(&mut self, page: &LocationAreaPage) {
        self.next = page.next.clone();
        self.previous = page.previous.clone();
    }
}

/// Main application struct holding REPL state
pub struct App {
    /// Current position in the location listing
    pub pagination: Pagination,
    /// Pokemon caught so far
    pub pokedex: Pokedex,
    /// Flag indicating the REPL should stop
    pub should_quit: bool,
    /// PokeAPI client with its response cache
    client: PokeApiClient,
    /// Source of catch rolls
    rng: StdRng,
}

impl App {
    /// Creates a new App starting at the first location page
    pub fn new(client: PokeApiClient) -> Self {
        Self::with_rng(client, StdRng::from_entropy())
    }

    /// Creates a new App with a fixed random source (for testing)
    pub fn with_rng(client: PokeApiClient, rng: StdRng) -> Self {
        let pagination = Pagination {
            next: Some(client.first_location_page_url()),
            previous: None,
        };
        Self {
            pagination,
            pokedex: Pokedex::new(),
            should_quit: false,
            client,
            rng,
        }
    }

    /// The PokeAPI client used by this app
    pub fn client(&self) -> &PokeApiClient {
        &self.client
    }

    /// Cleans, parses and runs one input line
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<(), CommandError> {
        let words = clean_input(line);
        match Command::parse(&words)? {
            Some(command) => self.execute(command, out).await,
            None => Ok(()),
        }
    }

    /// Runs a parsed command
    pub async fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<(), CommandError> {
        debug!(?command, "executing command");
        match command {
            Command::Help => Ok(print_welcome(out)?),
            Command::Exit => self.exit(out),
            Command::Map => self.map(out).await,
            Command::MapBack => self.map_back(out).await,
            Command::Explore(area) => self.explore(&area, out).await,
            Command::Catch(name) => self.catch(&name, out).await,
            Command::Inspect(name) => self.inspect(&name, out),
            Command::Pokedex => self.list_pokedex(out),
        }
    }

    /// Stops the response cache's sweep task
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }

    fn exit<W: Write>(&mut self, out: &mut W) -> Result<(), CommandError> {
        writeln!(out, "Closing the Pokedex... Goodbye!")?;
        self.should_quit = true;
        Ok(())
    }

    async fn map<W: Write>(&mut self, out: &mut W) -> Result<(), CommandError> {
        let Some(url) = self.pagination.next.clone() else {
            writeln!(out, "you're on the last page")?;
            return Ok(());
        };
        self.show_page(&url, out).await
    }

    async fn map_back<W: Write>(&mut self, out: &mut W) -> Result<(), CommandError> {
        let Some(url) = self.pagination.previous.clone() else {
            writeln!(out, "you're on the first page")?;
            return Ok(());
        };
        self.show_page(&url, out).await?;
        if self.pagination.previous.is_none() {
            writeln!(out, "you're on the first page")?;
        }
        Ok(())
    }

    async fn show_page<W: Write>(&mut self, url: &str, out: &mut W) -> Result<(), CommandError> {
        let page = self.client.fetch_location_page(url).await?;
        for area in &page.results {
            writeln!(out, "{}", area.name)?;
        }
        self.pagination.follow(&page);
        Ok(())
    }

    async fn explore<W: Write>(&mut self, area: &str, out: &mut W) -> Result<(), CommandError> {
        writeln!(out, "Exploring {}...", area)?;
        let location = self.client.fetch_location_area(area).await?;
        writeln!(out, "Found Pokemon:")?;
        for encounter in &location.pokemon_encounters {
            writeln!(out, " - {}", encounter.pokemon.name)?;
        }
        Ok(())
    }

    async fn catch<W: Write>(&mut self, name: &str, out: &mut W) -> Result<(), CommandError> {
        writeln!(out, "Throwing a Pokeball at {}...", name)?;
        if self.pokedex.contains(name) {
            writeln!(out, "{} is already in your Pokedex!", name)?;
            return Ok(());
        }

        let pokemon = CaughtPokemon::from(self.client.fetch_pokemon(name).await?);
        if attempt_catch(&mut self.rng, pokemon.base_experience) {
            writeln!(out, "{} was caught!", pokemon.name)?;
            info!(pokemon = %pokemon.name, "pokemon caught");
            self.pokedex.add(name, pokemon);
        } else {
            writeln!(out, "{} escaped!", pokemon.name)?;
        }
        Ok(())
    }

    fn inspect<W: Write>(&self, name: &str, out: &mut W) -> Result<(), CommandError> {
        let Some(pokemon) = self.pokedex.get(name) else {
            writeln!(out, "You have not caught that Pokemon")?;
            return Ok(());
        };

        writeln!(out, "Name: {}", pokemon.name)?;
        writeln!(out, "Height: {}", pokemon.height)?;
        writeln!(out, "Weight: {}", pokemon.weight)?;
        writeln!(out, "Stats:")?;
        for stat in &pokemon.stats {
            writeln!(out, "  - {}: {}", stat.name, stat.base_stat)?;
        }
        writeln!(out, "Types:")?;
        for kind in &pokemon.types {
            writeln!(out, "  - {}", kind)?;
        }
        Ok(())
    }

    fn list_pokedex<W: Write>(&self, out: &mut W) -> Result<(), CommandError> {
        writeln!(out, "Your Pokedex:")?;
        for name in self.pokedex.names() {
            writeln!(out, " - {}", name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use std::time::Duration;

    // Nothing listens here, so only cached responses can succeed
    const OFFLINE_BASE: &str = "http://127.0.0.1:9";

    const PAGE_ONE: &str = r#"{
        "count": 4,
        "next": "http://127.0.0.1:9/location-area/?offset=2&limit=2",
        "previous": null,
        "results": [
            {"name": "canalave-city-area", "url": "http://127.0.0.1:9/location-area/1/"},
            {"name": "eterna-city-area", "url": "http://127.0.0.1:9/location-area/2/"}
        ]
    }"#;

    const PAGE_TWO: &str = r#"{
        "count": 4,
        "next": null,
        "previous": "http://127.0.0.1:9/location-area/?offset=0&limit=2",
        "results": [
            {"name": "pastoria-city-area", "url": "http://127.0.0.1:9/location-area/3/"},
            {"name": "sunyshore-city-area", "url": "http://127.0.0.1:9/location-area/4/"}
        ]
    }"#;

    const PASTORIA: &str = r#"{
        "id": 3,
        "name": "pastoria-city-area",
        "pokemon_encounters": [
            {"pokemon": {"name": "tentacool", "url": "http://127.0.0.1:9/pokemon/72/"}},
            {"pokemon": {"name": "magikarp", "url": "http://127.0.0.1:9/pokemon/129/"}}
        ]
    }"#;

    // Zero base experience means every roll succeeds
    const CATERPIE: &str = r#"{
        "name": "caterpie",
        "base_experience": 0,
        "height": 3,
        "weight": 29,
        "stats": [
            {"base_stat": 45, "effort": 1, "stat": {"name": "hp", "url": ""}},
            {"base_stat": 30, "effort": 0, "stat": {"name": "attack", "url": ""}}
        ],
        "types": [{"slot": 1, "type": {"name": "bug", "url": ""}}]
    }"#;

    fn offline_app() -> App {
        let cache = Cache::new(Duration::from_secs(60)).expect("Cache should start");
        let client = PokeApiClient::with_base_url(cache, OFFLINE_BASE);
        App::with_rng(client, StdRng::seed_from_u64(1))
    }

    async fn run(app: &mut App, line: &str) -> Result<String, CommandError> {
        let mut out = Vec::new();
        app.handle_line(line, &mut out).await?;
        Ok(String::from_utf8(out).expect("Output should be UTF-8"))
    }

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_input_trims_and_splits() {
        assert_eq!(clean_input("  hello  world  "), words(&["hello", "world"]));
    }

    #[test]
    fn test_clean_input_lowercases() {
        assert_eq!(clean_input("Hello World"), words(&["hello", "world"]));
    }

    #[test]
    fn test_clean_input_strips_special_characters() {
        assert_eq!(
            clean_input("Explore mt-coronet-1f!? "),
            words(&["explore", "mt-coronet-1f"])
        );
        assert!(clean_input("?!.").is_empty());
    }

    #[test]
    fn test_parse_empty_input_is_none() {
        assert_eq!(Command::parse(&[]).unwrap(), None);
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            Command::parse(&words(&["catch", "pikachu"])).unwrap(),
            Some(Command::Catch("pikachu".to_string()))
        );
        assert_eq!(
            Command::parse(&words(&["explore", "pastoria-city-area", "extra"])).unwrap(),
            Some(Command::Explore("pastoria-city-area".to_string()))
        );
        assert_eq!(Command::parse(&words(&["mapb"])).unwrap(), Some(Command::MapBack));
    }

    #[test]
    fn test_parse_missing_argument() {
        let err = Command::parse(&words(&["inspect"])).unwrap_err();
        assert!(matches!(err, CommandError::MissingArgument { command: "inspect", .. }));
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = Command::parse(&words(&["fly"])).unwrap_err();
        assert!(err.to_string().contains("fly"));
    }

    #[test]
    fn test_help_lists_every_command() {
        let mut out = Vec::new();
        print_welcome(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        for (name, _) in COMMANDS {
            assert!(text.contains(name), "help should mention {}", name);
        }
    }

    #[tokio::test]
    async fn test_exit_sets_should_quit() {
        let mut app = offline_app();
        let output = run(&mut app, "exit").await.unwrap();
        assert!(output.contains("Goodbye"));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_map_and_mapb_follow_pagination() {
        let mut app = offline_app();
        let first = app.client().first_location_page_url();
        let cache = app.client().cache();
        cache.insert(first, PAGE_ONE);
        cache.insert("http://127.0.0.1:9/location-area/?offset=2&limit=2", PAGE_TWO);
        cache.insert("http://127.0.0.1:9/location-area/?offset=0&limit=2", PAGE_ONE);

        let output = run(&mut app, "map").await.unwrap();
        assert_eq!(output, "canalave-city-area\neterna-city-area\n");

        let output = run(&mut app, "map").await.unwrap();
        assert_eq!(output, "pastoria-city-area\nsunyshore-city-area\n");
        assert!(app.pagination.next.is_none());

        let output = run(&mut app, "map").await.unwrap();
        assert_eq!(output, "you're on the last page\n");

        let output = run(&mut app, "mapb").await.unwrap();
        assert_eq!(
            output,
            "canalave-city-area\neterna-city-area\nyou're on the first page\n"
        );
        assert!(app.pagination.previous.is_none());

        let output = run(&mut app, "mapb").await.unwrap();
        assert_eq!(output, "you're on the first page\n");
    }

    #[tokio::test]
    async fn test_mapb_on_start_is_first_page() {
        let mut app = offline_app();
        let output = run(&mut app, "mapb").await.unwrap();
        assert_eq!(output, "you're on the first page\n");
    }

    #[tokio::test]
    async fn test_explore_lists_encounters() {
        let mut app = offline_app();
        let url = app.client().location_area_url("pastoria-city-area");
        app.client().cache().insert(url, PASTORIA);

        let output = run(&mut app, "explore pastoria-city-area").await.unwrap();

        assert_eq!(
            output,
            "Exploring pastoria-city-area...\nFound Pokemon:\n - tentacool\n - magikarp\n"
        );
    }

    #[tokio::test]
    async fn test_explore_fetch_failure_is_an_error() {
        let mut app = offline_app();
        let result = run(&mut app, "explore nowhere").await;
        assert!(matches!(result, Err(CommandError::Api(ApiError::Request(_)))));
    }

    #[tokio::test]
    async fn test_catch_inspect_and_list() {
        let mut app = offline_app();
        let url = app.client().pokemon_url("caterpie");
        app.client().cache().insert(url, CATERPIE);

        let output = run(&mut app, "catch caterpie").await.unwrap();
        assert_eq!(output, "Throwing a Pokeball at caterpie...\ncaterpie was caught!\n");
        assert!(app.pokedex.contains("caterpie"));

        let output = run(&mut app, "catch caterpie").await.unwrap();
        assert!(output.contains("caterpie is already in your Pokedex!"));

        let output = run(&mut app, "inspect caterpie").await.unwrap();
        assert_eq!(
            output,
            "Name: caterpie\nHeight: 3\nWeight: 29\nStats:\n  - hp: 45\n  - attack: 30\nTypes:\n  - bug\n"
        );

        let output = run(&mut app, "pokedex").await.unwrap();
        assert_eq!(output, "Your Pokedex:\n - caterpie\n");
    }

    #[tokio::test]
    async fn test_inspect_uncaught_pokemon() {
        let mut app = offline_app();
        let output = run(&mut app, "inspect mew").await.unwrap();
        assert_eq!(output, "You have not caught that Pokemon\n");
    }

    #[tokio::test]
    async fn test_empty_line_does_nothing() {
        let mut app = offline_app();
        let output = run(&mut app, "   ").await.unwrap();
        assert!(output.is_empty());
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_shutdown_completes() {
        let app = offline_app();
        let result = tokio::time::timeout(Duration::from_secs(1), app.shutdown()).await;
        assert!(result.is_ok());
    }
}
