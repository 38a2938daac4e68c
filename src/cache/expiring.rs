//! Expiring cache backed by a background sweep task
//!
//! Provides a `Cache` that stores raw response bodies keyed by request URL.
//! Entries stay visible until the sweep task removes them, which happens on
//! the first tick after an entry's age reaches the cache interval.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Errors that can occur when constructing a cache
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The expiry interval was zero
    #[error("cache interval must be greater than zero")]
    ZeroInterval,

    /// No tokio runtime was available to run the sweep task
    #[error("cache sweep loop requires a running tokio runtime")]
    NoRuntime,
}

/// A single cached response
#[derive(Debug, Clone)]
struct Entry {
    /// The raw response body
    payload: Bytes,
    /// When the entry was inserted
    created_at: Instant,
}

type Entries = Arc<RwLock<HashMap<String, Entry>>>;

/// Thread-safe key-value cache whose entries expire after a fixed interval
///
/// The interval is both the maximum age of an entry and the period of the
/// sweep task, so an entry is removed no earlier than `interval` and no later
/// than `2 * interval` after its last insert.
#[derive(Debug)]
pub struct Cache {
    /// Cached entries keyed by request URL
    entries: Entries,
    /// Expiry age and sweep period
    interval: Duration,
    /// Signals the sweep task to stop
    shutdown_tx: mpsc::Sender<()>,
    /// Handle to the sweep task, taken on shutdown
    sweeper: Option<JoinHandle<()>>,
}

impl Cache {
    /// Creates a new cache and starts its sweep task on the current tokio runtime
    ///
    /// # Arguments
    /// * `interval` - How long an entry lives before it becomes eligible for removal
    ///
    /// # Returns
    /// * `Ok(Cache)` ready for use
    /// * `Err(CacheError::ZeroInterval)` if `interval` is zero
    /// * `Err(CacheError::NoRuntime)` if called outside a tokio runtime
    pub fn new(interval: Duration) -> Result<Self, CacheError> {
        if interval.is_zero() {
            return Err(CacheError::ZeroInterval);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let entries: Entries = Arc::new(RwLock::new(HashMap::new()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let sweeper = runtime.spawn(sweep_loop(Arc::clone(&entries), interval, shutdown_rx));

        debug!(interval_ms = interval.as_millis() as u64, "cache sweep loop started");

        Ok(Self {
            entries,
            interval,
            shutdown_tx,
            sweeper: Some(sweeper),
        })
    }

    /// Stores `payload` under `key`, replacing any previous entry and resetting its age
    pub fn insert(&self, key: impl Into<String>, payload: impl Into<Bytes>) {
        let key = key.into();
        let entry = Entry {
            payload: payload.into(),
            created_at: Instant::now(),
        };
        trace!(%key, bytes = entry.payload.len(), "cache insert");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    /// Returns the payload stored under `key`, or `None` on a miss
    ///
    /// Age is not checked here: an entry remains visible until the sweep
    /// task removes it.
    pub fn lookup(&self, key: &str) -> Option<Bytes> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|entry| entry.payload.clone())
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The expiry interval this cache was created with
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stops the sweep task and waits for it to finish
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(sweeper) = self.sweeper.take() {
            let _ = sweeper.await;
        }
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

/// Removes expired entries every `interval` until signalled to stop
async fn sweep_loop(entries: Entries, interval: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the first tick (immediate)
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = remove_expired(&entries, interval, Instant::now());
                if removed > 0 {
                    debug!(removed, "swept expired cache entries");
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("cache sweep loop stopped");
                break;
            }
        }
    }
}

/// Removes every entry whose age at `now` is at least `interval`
///
/// Returns the number of entries removed.
fn remove_expired(entries: &Entries, interval: Duration, now: Instant) -> usize {
    let mut map = entries.write().unwrap_or_else(PoisonError::into_inner);
    let before = map.len();
    map.retain(|_, entry| now.saturating_duration_since(entry.created_at) < interval);
    before - map.len()
}
