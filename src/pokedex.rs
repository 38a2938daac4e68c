//! The player's registry of caught pokemon
//!
//! `Pokedex` is plain owned state: the REPL holds one and passes it to the
//! command handlers that need it.

use std::collections::BTreeMap;

use rand::Rng;

use crate::data::Pokemon;

/// Highest catch threshold; every pokemon keeps at least this much headroom
const MAX_CATCH_THRESHOLD: u32 = 90;

/// A single base stat of a caught pokemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub name: String,
    pub base_stat: u32,
}

/// A pokemon recorded in the Pokedex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtPokemon {
    pub name: String,
    pub base_experience: u32,
    pub height: u32,
    pub weight: u32,
    pub stats: Vec<Stat>,
    pub types: Vec<String>,
}

impl From<Pokemon> for CaughtPokemon {
    fn from(pokemon: Pokemon) -> Self {
        Self {
            name: pokemon.name,
            base_experience: pokemon.base_experience.unwrap_or(0),
            height: pokemon.height,
            weight: pokemon.weight,
            stats: pokemon
                .stats
                .into_iter()
                .map(|s| Stat {
                    name: s.stat.name,
                    base_stat: s.base_stat,
                })
                .collect(),
            types: pokemon.types.into_iter().map(|t| t.kind.name).collect(),
        }
    }
}

/// Caught pokemon keyed by name, iterated in name order
#[derive(Debug, Default)]
pub struct Pokedex {
    caught: BTreeMap<String, CaughtPokemon>,
}

impl Pokedex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.caught.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&CaughtPokemon> {
        self.caught.get(name)
    }

    /// Records a caught pokemon under `name`, replacing any earlier record
    pub fn add(&mut self, name: impl Into<String>, pokemon: CaughtPokemon) {
        self.caught.insert(name.into(), pokemon);
    }

    /// Names of all caught pokemon in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.caught.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.caught.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caught.is_empty()
    }
}

/// Roll needed to beat for a catch, scaling with base experience
///
/// Stronger pokemon are harder to catch, capped so every catch keeps a 10%
/// chance. This inverts the older `100 - base_experience / 2` threshold,
/// which had no cap and made weak pokemon the hardest to catch.
pub fn catch_threshold(base_experience: u32) -> u32 {
    (base_experience / 2).min(MAX_CATCH_THRESHOLD)
}

/// Whether a roll in `1..=100` catches a pokemon with the given base experience
pub fn catch_succeeds(base_experience: u32, roll: u32) -> bool {
    roll > catch_threshold(base_experience)
}

/// Rolls a catch attempt with `rng`
pub fn attempt_catch<R: Rng>(rng: &mut R, base_experience: u32) -> bool {
    let roll = rng.gen_range(1..=100);
    catch_succeeds(base_experience, roll)
}
