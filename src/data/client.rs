//! PokeAPI client
//!
//! Fetches location and pokemon data from PokeAPI. Every request goes through
//! the response cache: a hit skips the network entirely, and a successful
//! fetch stores the raw body under the request URL.

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::{LocationArea, LocationAreaPage, Pokemon};
use crate::cache::Cache;

/// Base URL for PokeAPI v2
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Errors that can occur when fetching PokeAPI data
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with something other than 200 OK
    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },

    /// Failed to decode the JSON body
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for PokeAPI backed by an expiring response cache
#[derive(Debug)]
pub struct PokeApiClient {
    http_client: Client,
    cache: Cache,
    base_url: String,
}

impl PokeApiClient {
    /// Creates a client against the public PokeAPI
    pub fn new(cache: Cache) -> Self {
        Self::with_base_url(cache, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL (mirrors, tests)
    pub fn with_base_url(cache: Cache, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client: Client::new(),
            cache,
            base_url,
        }
    }

    /// The response cache used by this client
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// URL of the first location-area listing page
    pub fn first_location_page_url(&self) -> String {
        format!("{}/location-area/", self.base_url)
    }

    /// URL of a single location area
    pub fn location_area_url(&self, name: &str) -> String {
        format!("{}/location-area/{}/", self.base_url, name)
    }

    /// URL of a single pokemon
    pub fn pokemon_url(&self, name: &str) -> String {
        format!("{}/pokemon/{}", self.base_url, name)
    }

    /// Fetches one page of the location-area listing
    ///
    /// # Arguments
    /// * `url` - Page URL, either the first page or a `next`/`previous` link
    pub async fn fetch_location_page(&self, url: &str) -> Result<LocationAreaPage, ApiError> {
        self.get_json(url).await
    }

    /// Fetches the details of a location area by name or id
    pub async fn fetch_location_area(&self, name: &str) -> Result<LocationArea, ApiError> {
        self.get_json(&self.location_area_url(name)).await
    }

    /// Fetches a pokemon by name or id
    pub async fn fetch_pokemon(&self, name: &str) -> Result<Pokemon, ApiError> {
        self.get_json(&self.pokemon_url(name)).await
    }

    /// Stops the cache's sweep task
    pub async fn shutdown(self) {
        self.cache.shutdown().await;
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let body = self.get_bytes(url).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Returns the response body for `url`, from the cache when possible
    async fn get_bytes(&self, url: &str) -> Result<Bytes, ApiError> {
        if let Some(body) = self.cache.lookup(url) {
            debug!(%url, "cache hit");
            return Ok(body);
        }

        debug!(%url, "cache miss, fetching");
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        self.cache.insert(url, body.clone());
        Ok(body)
    }
}
